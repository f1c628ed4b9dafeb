//! Host shell UI: context provider and the surface desk rendering tabs and the popup.

use std::rc::Rc;

use desktop_app_storage_inspector::{InspectorPanel, SignalSurface, StorageInspector, TaskSpawner};
use futures::future::LocalBoxFuture;
use leptos::*;
use platform_host::HostServices;

use crate::{
    config::InspectorConfig,
    host::HostShell,
    model::{SurfaceId, SurfaceKind, SurfacesState},
};

#[component]
/// Provides a [`HostShell`] to descendant components.
pub fn HostShellProvider(
    /// Injected browser or stub host bundle assembled by the entry layer.
    host_services: HostServices,
    children: Children,
) -> impl IntoView {
    let spawner: TaskSpawner = Rc::new(|task: LocalBoxFuture<'static, ()>| spawn_local(task));
    let shell = HostShell::new(host_services, spawner);
    logging::log!(
        "host shell ready (strategy: {})",
        shell.services().host_strategy.as_str()
    );
    provide_context(shell);

    children().into_view()
}

/// Returns the current [`HostShell`].
///
/// # Panics
///
/// Panics if called outside [`HostShellProvider`].
pub fn use_host_shell() -> HostShell {
    use_context::<HostShell>().expect("HostShell not provided")
}

#[derive(Clone)]
struct DeskPanel {
    surface_id: SurfaceId,
    kind: SurfaceKind,
    surface: SignalSurface,
    inspector: StorageInspector,
}

fn surface_dom_id(surface_id: SurfaceId) -> String {
    format!("host-shell-{surface_id}")
}

fn surface_role(kind: SurfaceKind) -> &'static str {
    match kind {
        SurfaceKind::Tab => "tabpanel",
        SurfaceKind::Popup => "dialog",
    }
}

#[component]
/// Tab strip, tab panels, and popup overlay for every surface opened through the shell.
pub fn SurfaceDesk(
    /// Configuration opened on mount; also the template for the "New tab" and "Popup" actions.
    #[prop(optional)]
    initial: Option<InspectorConfig>,
) -> impl IntoView {
    let owner = Owner::current();
    let shell = store_value(use_host_shell());
    let surfaces = create_rw_signal(SurfacesState::default());
    let panels = create_rw_signal(Vec::<DeskPanel>::new());
    let notice = create_rw_signal(None::<String>);
    let template = store_value(initial.clone().unwrap_or_default());

    let sync = move || {
        let snapshot = shell.with_value(HostShell::surfaces);
        panels.update(|panels| {
            panels.retain(|panel| snapshot.surface(panel.surface_id).is_some())
        });
        surfaces.set(snapshot);
    };

    let open = move |config: InspectorConfig| {
        let surface = match owner {
            Some(owner) => with_owner(owner, SignalSurface::new),
            None => SignalSurface::new(),
        };
        let host = shell.get_value();
        spawn_local(async move {
            match host.open_inspector(config, Rc::new(surface)).await {
                Ok(session) => {
                    sync();
                    panels.update(|panels| {
                        panels.push(DeskPanel {
                            surface_id: session.surface_id,
                            kind: session.surface_kind,
                            surface,
                            inspector: session.inspector,
                        })
                    });
                    notice.set(None);
                }
                Err(err) => {
                    logging::warn!("open inspector failed: {err}");
                    notice.set(Some(err.to_string()));
                    sync();
                }
            }
        });
    };

    let close = move |surface_id: SurfaceId| {
        if let Err(err) = shell.with_value(|shell| shell.close_inspector(surface_id)) {
            logging::warn!("close inspector failed: {err}");
        }
        sync();
    };

    let focus = move |surface_id: SurfaceId| {
        if let Err(err) = shell.with_value(|shell| shell.focus_surface(surface_id)) {
            logging::warn!("focus surface failed: {err}");
        }
        sync();
    };

    let open_with_kind = move |kind: SurfaceKind| {
        let mut config = template.get_value();
        config.surface_kind = kind;
        open(config);
    };

    if let Some(initial) = initial {
        open(initial);
    }

    let tab_records = move || surfaces.with(|state| state.tabs().cloned().collect::<Vec<_>>());

    view! {
        <div class="host-shell-desk">
            <div class="host-shell-tabs" role="tablist" aria-label="Inspector tabs">
                <For
                    each=tab_records
                    key=|record| (record.id, record.is_focused, record.title.clone())
                    let:record
                >
                    <div class="host-shell-tab" class:is-active=record.is_focused>
                        <button
                            type="button"
                            role="tab"
                            class="host-shell-tab-label"
                            aria-selected=record.is_focused.to_string()
                            aria-controls=surface_dom_id(record.id)
                            on:click=move |_| focus(record.id)
                        >
                            {record.title.clone()}
                        </button>
                        <button
                            type="button"
                            class="host-shell-tab-close"
                            aria-label=format!("Close {}", record.title)
                            on:click=move |_| close(record.id)
                        >
                            "x"
                        </button>
                    </div>
                </For>
                <button type="button" class="app-action" on:click=move |_| open_with_kind(SurfaceKind::Tab)>
                    "New tab"
                </button>
                <button type="button" class="app-action" on:click=move |_| open_with_kind(SurfaceKind::Popup)>
                    "Popup"
                </button>
            </div>

            <Show when=move || notice.with(Option::is_some) fallback=|| ()>
                <div class="host-shell-notice" role="alert">
                    {move || notice.get().unwrap_or_default()}
                </div>
            </Show>

            <For each=move || panels.get() key=|panel| panel.surface_id let:panel>
                {
                    let surface_id = panel.surface_id;
                    let is_popup = panel.kind == SurfaceKind::Popup;
                    let visible = move || {
                        surfaces.with(|state| {
                            state.surface(surface_id).is_some_and(|record| {
                                record.kind == SurfaceKind::Popup || record.is_focused
                            })
                        })
                    };
                    view! {
                        <section
                            id=surface_dom_id(surface_id)
                            class="host-shell-surface"
                            class:is-popup=is_popup
                            role=surface_role(panel.kind)
                            style:display=move || if visible() { "" } else { "none" }
                        >
                            <Show when=move || is_popup fallback=|| ()>
                                <div class="host-shell-popup-header">
                                    <span>
                                        {move || {
                                            surfaces
                                                .with(|state| {
                                                    state.surface(surface_id).map(|record| record.title.clone())
                                                })
                                                .unwrap_or_default()
                                        }}
                                    </span>
                                    <button
                                        type="button"
                                        class="host-shell-tab-close"
                                        aria-label="Close popup"
                                        on:click=move |_| close(surface_id)
                                    >
                                        "x"
                                    </button>
                                </div>
                            </Show>
                            <InspectorPanel surface=panel.surface inspector=panel.inspector.clone() />
                        </section>
                    }
                }
            </For>
        </div>
    }
}
