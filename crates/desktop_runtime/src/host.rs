//! Host shell: opens inspectors inside display surfaces and executes surface reducer effects.

use std::{cell::RefCell, collections::BTreeMap, rc::Rc};

use desktop_app_storage_inspector::{InspectorSurface, StorageInspector, TaskSpawner};
use leptos::logging;
use platform_host::{CapabilityError, HostServices};
use thiserror::Error;

use crate::{
    config::InspectorConfig,
    model::{OpenSurfaceRequest, SurfaceId, SurfaceKind, SurfacesState},
    reducer::{reduce_surfaces, ReducerError, SurfaceAction, SurfaceEffect},
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Host shell failures.
pub enum HostShellError {
    /// The requested storage area is not provided by the host.
    #[error(transparent)]
    Capability(#[from] CapabilityError),
    /// The surface action was rejected.
    #[error(transparent)]
    Reducer(#[from] ReducerError),
    /// The launch payload is not a valid inspector configuration.
    #[error("invalid inspector config: {0}")]
    InvalidConfig(String),
}

#[derive(Debug, Clone)]
/// Inspector mounted in a display surface.
pub struct InspectorSession {
    /// Hosting surface.
    pub surface_id: SurfaceId,
    /// Kind of the hosting surface.
    pub surface_kind: SurfaceKind,
    /// Initialized inspector.
    pub inspector: StorageInspector,
}

struct HostShellInner {
    services: HostServices,
    spawner: TaskSpawner,
    state: RefCell<SurfacesState>,
    inspectors: RefCell<BTreeMap<SurfaceId, StorageInspector>>,
}

#[derive(Clone)]
/// Owner of every open surface and the inspector hosted in it.
pub struct HostShell {
    inner: Rc<HostShellInner>,
}

impl HostShell {
    /// Creates a shell over the injected host services.
    pub fn new(services: HostServices, spawner: TaskSpawner) -> Self {
        Self {
            inner: Rc::new(HostShellInner {
                services,
                spawner,
                state: RefCell::new(SurfacesState::default()),
                inspectors: RefCell::new(BTreeMap::new()),
            }),
        }
    }

    /// Returns the injected host services.
    pub fn services(&self) -> &HostServices {
        &self.inner.services
    }

    /// Returns a snapshot of the open surfaces.
    pub fn surfaces(&self) -> SurfacesState {
        self.inner.state.borrow().clone()
    }

    /// Returns the inspector hosted by `surface_id`.
    pub fn inspector(&self, surface_id: SurfaceId) -> Option<StorageInspector> {
        self.inner.inspectors.borrow().get(&surface_id).cloned()
    }

    fn dispatch(&self, action: SurfaceAction) -> Result<Vec<SurfaceEffect>, ReducerError> {
        let result = reduce_surfaces(&mut self.inner.state.borrow_mut(), action);
        if let Err(err) = &result {
            logging::warn!("host shell reducer error: {err}");
        }
        result
    }

    fn release(&self, surface_id: SurfaceId) {
        let released = self.inner.inspectors.borrow_mut().remove(&surface_id);
        if let Some(inspector) = released {
            inspector.close();
        }
    }

    /// Opens a surface of `config.surface_kind` and initializes an inspector inside it.
    ///
    /// Resolves once the surface exists and the inspector has rendered its first reconcile into
    /// `surface`.
    ///
    /// # Errors
    ///
    /// Returns [`HostShellError::Capability`] when the host does not provide the storage area
    /// (no surface is created), and [`HostShellError::Reducer`] when the surface was closed before
    /// the inspector finished initializing.
    pub async fn open_inspector(
        &self,
        config: InspectorConfig,
        surface: Rc<dyn InspectorSurface>,
    ) -> Result<InspectorSession, HostShellError> {
        let store = self
            .inner
            .services
            .store_for_area(&config.storage_area)
            .map_err(|err| {
                logging::warn!("host shell cannot open inspector: {err}");
                err
            })?;
        let options = config.inspector_options();
        let surface_kind = config.surface_kind;

        let mut mounted = None;
        let effects = self.dispatch(SurfaceAction::OpenSurface(OpenSurfaceRequest::new(config)))?;
        for effect in effects {
            match effect {
                SurfaceEffect::ReleaseInspector(surface_id) => self.release(surface_id),
                SurfaceEffect::MountInspector(surface_id) => mounted = Some(surface_id),
            }
        }
        let surface_id = mounted.ok_or(ReducerError::SurfaceNotFound)?;

        let inspector =
            StorageInspector::initialize(options, store, surface, self.inner.spawner.clone())
                .await;
        if self.inner.state.borrow().surface(surface_id).is_none() {
            inspector.close();
            return Err(ReducerError::SurfaceNotFound.into());
        }
        self.inner
            .inspectors
            .borrow_mut()
            .insert(surface_id, inspector.clone());

        Ok(InspectorSession {
            surface_id,
            surface_kind,
            inspector,
        })
    }

    /// Tears down a surface and releases its inspector's change subscription.
    ///
    /// # Errors
    ///
    /// Returns [`HostShellError::Reducer`] when the surface is not open.
    pub fn close_inspector(&self, surface_id: SurfaceId) -> Result<(), HostShellError> {
        for effect in self.dispatch(SurfaceAction::CloseSurface { surface_id })? {
            if let SurfaceEffect::ReleaseInspector(released) = effect {
                self.release(released);
            }
        }
        Ok(())
    }

    /// Focuses a surface.
    ///
    /// # Errors
    ///
    /// Returns [`HostShellError::Reducer`] when the surface is not open.
    pub fn focus_surface(&self, surface_id: SurfaceId) -> Result<(), HostShellError> {
        self.dispatch(SurfaceAction::FocusSurface { surface_id })?;
        Ok(())
    }
}
