use desktop_runtime::{current_inspector_config, HostShellProvider, SurfaceDesk};
use leptos::*;
use leptos_meta::*;
use leptos_router::*;

#[component]
pub fn SiteApp() -> impl IntoView {
    provide_meta_context();

    view! {
        <Title text="Storage Inspector" />
        <Meta name="description" content="Live, filterable, editable view over browser storage." />

        <Router>
            <main class="site-root">
                <Routes>
                    <Route path="" view=InspectorEntry />
                    <Route path="/area/:area" view=AreaRoute />
                </Routes>
            </main>
        </Router>
    }
}

#[component]
pub fn InspectorEntry() -> impl IntoView {
    view! {
        <HostShellProvider host_services=platform_host_web::build_host_services()>
            <SurfaceDesk initial=current_inspector_config() />
        </HostShellProvider>
    }
}

#[component]
fn AreaRoute() -> impl IntoView {
    let params = use_params_map();
    let area = params.with_untracked(|map| map.get("area").cloned());
    let mut config = current_inspector_config();
    if let Some(area) = area.filter(|area| !area.trim().is_empty()) {
        config.storage_area = platform_host::StorageAreaName::new(area.trim());
    }

    view! {
        <HostShellProvider host_services=platform_host_web::build_host_services()>
            <SurfaceDesk initial=config />
        </HostShellProvider>
    }
}
