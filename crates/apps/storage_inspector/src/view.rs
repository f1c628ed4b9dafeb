//! Leptos rendering of an inspector: a signal-backed surface and the inspector panel component.

use std::sync::atomic::{AtomicUsize, Ordering};

use leptos::*;
use platform_host::StorageValueType;
use web_sys::{Element, Event, KeyboardEvent};
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::{closure::Closure, JsCast};

use crate::{
    edit::{key_action, KeyPress},
    inspector::StorageInspector,
    rows::{DisplayedRow, RowHandle},
    surface::{InspectorSurface, ShellView, ViewPatch, TOGGLE_PULSE_MS},
};

static NEXT_INSPECTOR_INSTANCE_ID: AtomicUsize = AtomicUsize::new(1);

#[derive(Debug, Clone)]
/// Reactive row element.
pub struct RowView {
    /// Row handle, used as the list key.
    pub handle: RowHandle,
    /// Entry key.
    pub key: String,
    /// Value type; fixed for the lifetime of the element.
    pub value_type: StorageValueType,
    /// Compact rendered value.
    pub display_text: RwSignal<String>,
    /// Initial editor text while the editor is open.
    pub editor: RwSignal<Option<String>>,
    /// Inline error.
    pub error: RwSignal<Option<String>>,
    /// Whether the toggle highlight is showing.
    pub pulsing: RwSignal<bool>,
}

#[derive(Debug, Clone, Copy)]
/// [`InspectorSurface`] that maps view patches onto Leptos signals.
///
/// Row signals are created under the owner captured at construction so patches applied from
/// spawned tasks stay attached to the component tree.
pub struct SignalSurface {
    instance_id: usize,
    owner: Option<Owner>,
    /// Mounted shell.
    pub shell: RwSignal<Option<ShellView>>,
    /// Rendered rows in presentation order.
    pub rows: RwSignal<Vec<RowView>>,
    /// Inspector notice.
    pub notice: RwSignal<Option<String>>,
}

impl SignalSurface {
    /// Creates an empty surface owned by the current reactive owner.
    pub fn new() -> Self {
        Self {
            instance_id: NEXT_INSPECTOR_INSTANCE_ID.fetch_add(1, Ordering::Relaxed),
            owner: Owner::current(),
            shell: create_rw_signal(None),
            rows: create_rw_signal(Vec::new()),
            notice: create_rw_signal(None),
        }
    }

    /// Returns the DOM id of the editor element for `handle`.
    pub fn editor_dom_id(&self, handle: RowHandle) -> String {
        format!("storage-inspector-{}-{handle}-editor", self.instance_id)
    }

    fn create_row(&self, handle: RowHandle, row: DisplayedRow) -> RowView {
        let build = move || RowView {
            handle,
            key: row.key,
            value_type: row.value_type,
            display_text: create_rw_signal(row.display_text),
            editor: create_rw_signal(None),
            error: create_rw_signal(None),
            pulsing: create_rw_signal(false),
        };
        match self.owner {
            Some(owner) => with_owner(owner, build),
            None => build(),
        }
    }

    fn row(&self, handle: RowHandle) -> Option<RowView> {
        self.rows
            .with_untracked(|rows| rows.iter().find(|row| row.handle == handle).cloned())
    }
}

impl Default for SignalSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl InspectorSurface for SignalSurface {
    fn apply(&self, patch: ViewPatch) {
        match patch {
            ViewPatch::MountShell(shell) => self.shell.set(Some(shell)),
            ViewPatch::InsertRow {
                handle,
                position,
                row,
            } => {
                let view = self.create_row(handle, row);
                self.rows.update(|rows| {
                    let position = position.min(rows.len());
                    rows.insert(position, view);
                });
            }
            ViewPatch::PatchText {
                handle,
                display_text,
                ..
            } => {
                if let Some(row) = self.row(handle) {
                    row.display_text.set(display_text);
                }
            }
            ViewPatch::RemoveRow { handle } => {
                self.rows.update(|rows| rows.retain(|row| row.handle != handle))
            }
            ViewPatch::OpenEditor { handle, buffer } => {
                if let Some(row) = self.row(handle) {
                    row.editor.set(Some(buffer));
                    focus_element(self.editor_dom_id(handle));
                }
            }
            ViewPatch::CloseEditor { handle } => {
                if let Some(row) = self.row(handle) {
                    row.editor.set(None);
                }
            }
            ViewPatch::SetRowError { handle, error } => {
                if let Some(row) = self.row(handle) {
                    row.error.set(error);
                }
            }
            ViewPatch::Pulse { handle } => {
                if let Some(row) = self.row(handle) {
                    row.pulsing.set(true);
                    clear_pulse_later(row.pulsing);
                }
            }
            ViewPatch::SetNotice { notice } => self.notice.set(notice),
        }
    }
}

fn focus_element(dom_id: String) {
    #[cfg(target_arch = "wasm32")]
    {
        let Some(window) = web_sys::window() else {
            return;
        };
        let callback = Closure::once_into_js(move || {
            let Some(element) = web_sys::window()
                .and_then(|window| window.document())
                .and_then(|document| document.get_element_by_id(&dom_id))
            else {
                return;
            };
            if let Ok(element) = element.dyn_into::<web_sys::HtmlElement>() {
                let _ = element.focus();
            }
        });
        let _ = window
            .set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), 0);
    }
    #[cfg(not(target_arch = "wasm32"))]
    let _ = dom_id;
}

fn clear_pulse_later(pulsing: RwSignal<bool>) {
    #[cfg(target_arch = "wasm32")]
    {
        let Some(window) = web_sys::window() else {
            return;
        };
        let callback = Closure::once_into_js(move || {
            let _ = pulsing.try_set(false);
        });
        let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(
            callback.unchecked_ref(),
            TOGGLE_PULSE_MS as i32,
        );
    }
    #[cfg(not(target_arch = "wasm32"))]
    let _ = (pulsing, TOGGLE_PULSE_MS);
}

fn with_inspector(
    inspector: StoredValue<Option<StorageInspector>>,
    f: impl FnOnce(StorageInspector),
) {
    if let Some(inspector) = inspector.get_value() {
        f(inspector);
    }
}

#[component]
/// Inspector panel attached to an inspector owned elsewhere (for example, by a host shell).
///
/// Disposing the panel leaves the inspector and its subscription untouched.
pub fn InspectorPanel(
    /// Surface the inspector was initialized with.
    surface: SignalSurface,
    /// Initialized inspector.
    inspector: StorageInspector,
) -> impl IntoView {
    let filter_text = create_rw_signal(inspector.user_filter());
    let inspector = store_value(Some(inspector));
    inspector_panel(surface, inspector, filter_text)
}

fn entry_count_label(count: usize) -> String {
    match count {
        1 => "1 entry".to_string(),
        n => format!("{n} entries"),
    }
}

fn inspector_panel(
    surface: SignalSurface,
    inspector: StoredValue<Option<StorageInspector>>,
    filter_text: RwSignal<String>,
) -> impl IntoView {
    let on_filter_input = move |ev: Event| {
        let text = event_target_value(&ev);
        filter_text.set(text.clone());
        with_inspector(inspector, |inspector| {
            spawn_local(async move {
                let _ = inspector.set_user_filter(text).await;
            });
        });
    };

    view! {
        <div class="app-shell storage-inspector-shell">
            <div class="storage-inspector-toolbar">
                <span class="storage-inspector-area">
                    {move || {
                        surface
                            .shell
                            .get()
                            .map(|shell| shell.area.to_string())
                            .unwrap_or_default()
                    }}
                </span>
                <Show
                    when=move || surface.shell.with(|shell| {
                        shell.as_ref().is_some_and(|shell| !shell.base_filter.is_empty())
                    })
                    fallback=|| ()
                >
                    <span class="storage-inspector-base-filter">
                        {move || {
                            surface
                                .shell
                                .get()
                                .map(|shell| shell.base_filter)
                                .unwrap_or_default()
                        }}
                    </span>
                </Show>
                <input
                    class="app-field storage-inspector-filter"
                    type="search"
                    placeholder="Filter keys"
                    aria-label="Filter keys"
                    autocomplete="off"
                    spellcheck="false"
                    prop:value=move || filter_text.get()
                    on:input=on_filter_input
                />
            </div>

            <Show when=move || surface.notice.with(Option::is_some) fallback=|| ()>
                <div class="storage-inspector-notice" role="status">
                    {move || surface.notice.get().unwrap_or_default()}
                </div>
            </Show>

            <table class="storage-inspector-table">
                <thead>
                    <tr>
                        <th scope="col">"Key"</th>
                        <th scope="col">"Type"</th>
                        <th scope="col">"Value"</th>
                    </tr>
                </thead>
                <tbody>
                    <For each=move || surface.rows.get() key=|row| row.handle let:row>
                        <InspectorRow
                            editor_id=surface.editor_dom_id(row.handle)
                            row=row
                            inspector=inspector
                        />
                    </For>
                </tbody>
            </table>

            <div class="app-statusbar">
                <span>{move || entry_count_label(surface.rows.with(Vec::len))}</span>
                <span class="storage-inspector-footer">
                    {move || surface.shell.get().and_then(|shell| shell.footer_text).unwrap_or_default()}
                </span>
            </div>
        </div>
    }
}

#[component]
fn InspectorRow(
    row: RowView,
    inspector: StoredValue<Option<StorageInspector>>,
    editor_id: String,
) -> impl IntoView {
    let handle = row.handle;
    let value_type = row.value_type;
    let display_text = row.display_text;
    let editor = row.editor;
    let error = row.error;

    let toggle = move |_| {
        with_inspector(inspector, |inspector| {
            spawn_local(async move {
                let _ = inspector.toggle(handle).await;
            });
        })
    };
    let begin_edit = move |_| {
        with_inspector(inspector, |inspector| {
            if let Err(err) = inspector.begin_edit(handle) {
                logging::debug_warn!("storage inspector could not open editor: {err}");
            }
        })
    };
    let commit = move || {
        with_inspector(inspector, |inspector| {
            spawn_local(async move {
                let _ = inspector.commit_edit(handle).await;
            });
        })
    };
    let cancel = move || {
        with_inspector(inspector, |inspector| {
            let _ = inspector.cancel_edit(handle);
        })
    };
    let on_editor_input = move |ev: Event| {
        let text = event_target_value(&ev);
        with_inspector(inspector, |inspector| {
            let _ = inspector.update_buffer(handle, text);
        })
    };
    let row_editor_id = editor_id.clone();
    let on_row_keydown = move |ev: KeyboardEvent| {
        if editor.with_untracked(Option::is_none) {
            return;
        }
        let press = KeyPress {
            key: ev.key(),
            ctrl: ev.ctrl_key(),
            meta: ev.meta_key(),
            shift: ev.shift_key(),
            outside_editor: event_target::<Element>(&ev).id() != row_editor_id,
        };
        if key_action(value_type, &press).is_none() {
            return;
        }
        ev.prevent_default();
        with_inspector(inspector, |inspector| {
            spawn_local(async move {
                let _ = inspector.handle_key(handle, &press).await;
            });
        });
    };

    let value_cell = move || {
        let editor_id = editor_id.clone();
        match (value_type, editor.get()) {
            (StorageValueType::Boolean, _) => view! {
                <button
                    type="button"
                    class="app-action storage-inspector-toggle"
                    aria-pressed=move || display_text.get()
                    on:click=toggle
                >
                    {move || display_text.get()}
                </button>
            }
            .into_view(),
            (_, None) => view! {
                <span class="storage-inspector-display">{move || display_text.get()}</span>
                <button type="button" class="app-action storage-inspector-edit" on:click=begin_edit>
                    "Edit"
                </button>
            }
            .into_view(),
            (StorageValueType::Object, Some(buffer)) => view! {
                <textarea
                    id=editor_id
                    class="app-field storage-inspector-editor"
                    rows="6"
                    spellcheck="false"
                    prop:value=buffer
                    on:input=on_editor_input
                ></textarea>
                <EditorActions commit=commit cancel=cancel />
            }
            .into_view(),
            (_, Some(buffer)) => view! {
                <input
                    id=editor_id
                    class="app-field storage-inspector-editor"
                    type="text"
                    spellcheck="false"
                    prop:value=buffer
                    on:input=on_editor_input
                />
                <EditorActions commit=commit cancel=cancel />
            }
            .into_view(),
        }
    };

    view! {
        <tr
            class="storage-inspector-row"
            class:is-pulsing=move || row.pulsing.get()
            data-key=row.key.clone()
            on:keydown=on_row_keydown
        >
            <td class="storage-inspector-key">{row.key.clone()}</td>
            <td class="storage-inspector-type">{value_type.as_str()}</td>
            <td class="storage-inspector-value">
                {value_cell}
                <Show when=move || error.with(Option::is_some) fallback=|| ()>
                    <span class="storage-inspector-error" role="alert">
                        {move || error.get().unwrap_or_default()}
                    </span>
                </Show>
            </td>
        </tr>
    }
}

#[component]
fn EditorActions<C, X>(commit: C, cancel: X) -> impl IntoView
where
    C: Fn() + Copy + 'static,
    X: Fn() + Copy + 'static,
{
    view! {
        <button type="button" class="app-action storage-inspector-save" on:click=move |_| commit()>
            "Save"
        </button>
        <button type="button" class="app-action storage-inspector-cancel" on:click=move |_| cancel()>
            "Cancel"
        </button>
    }
}
