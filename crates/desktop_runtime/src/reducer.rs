//! Reducer actions, side-effect intents, and transition logic for host shell surfaces.

use thiserror::Error;

use crate::model::{
    OpenSurfaceRequest, SurfaceId, SurfaceKind, SurfaceRecord, SurfacesState,
};

#[derive(Debug, Clone, PartialEq)]
/// Actions accepted by [`reduce_surfaces`] to mutate [`SurfacesState`].
pub enum SurfaceAction {
    /// Open a new surface using the supplied request.
    OpenSurface(OpenSurfaceRequest),
    /// Close a surface by id.
    CloseSurface {
        /// Surface to close.
        surface_id: SurfaceId,
    },
    /// Focus a surface by id.
    FocusSurface {
        /// Surface to focus.
        surface_id: SurfaceId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Side-effect intents emitted by [`reduce_surfaces`] for the host shell to execute.
pub enum SurfaceEffect {
    /// Initialize an inspector inside the newly created surface.
    MountInspector(SurfaceId),
    /// Release the inspector hosted by a surface that no longer exists.
    ReleaseInspector(SurfaceId),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Reducer errors for invalid actions.
pub enum ReducerError {
    /// The target surface id was not found in the current state.
    #[error("surface not found")]
    SurfaceNotFound,
}

/// Applies a [`SurfaceAction`] to the surface state and collects resulting side effects.
///
/// Opening a popup while another popup is open replaces it. The newest opened surface takes
/// focus; closing the focused surface moves focus to the most recently opened remaining one.
///
/// # Errors
///
/// Returns [`ReducerError::SurfaceNotFound`] when an action references a missing surface.
pub fn reduce_surfaces(
    state: &mut SurfacesState,
    action: SurfaceAction,
) -> Result<Vec<SurfaceEffect>, ReducerError> {
    let mut effects = Vec::new();
    match action {
        SurfaceAction::OpenSurface(req) => {
            let kind = req.config.surface_kind;
            if kind == SurfaceKind::Popup {
                let replaced: Vec<SurfaceId> = state
                    .surfaces
                    .iter()
                    .filter(|surface| surface.kind == SurfaceKind::Popup)
                    .map(|surface| surface.id)
                    .collect();
                state
                    .surfaces
                    .retain(|surface| surface.kind != SurfaceKind::Popup);
                effects.extend(replaced.into_iter().map(SurfaceEffect::ReleaseInspector));
            }

            let surface_id = next_surface_id(state);
            let title = req
                .title
                .unwrap_or_else(|| OpenSurfaceRequest::default_title(&req.config));
            state.surfaces.push(SurfaceRecord {
                id: surface_id,
                kind,
                title,
                config: req.config,
                is_focused: false,
            });
            focus_surface_internal(state, surface_id)?;
            effects.push(SurfaceEffect::MountInspector(surface_id));
        }
        SurfaceAction::CloseSurface { surface_id } => {
            let before_len = state.surfaces.len();
            state.surfaces.retain(|surface| surface.id != surface_id);
            if state.surfaces.len() == before_len {
                return Err(ReducerError::SurfaceNotFound);
            }
            normalize_focus(state);
            effects.push(SurfaceEffect::ReleaseInspector(surface_id));
        }
        SurfaceAction::FocusSurface { surface_id } => {
            focus_surface_internal(state, surface_id)?;
        }
    }
    Ok(effects)
}

fn next_surface_id(state: &mut SurfacesState) -> SurfaceId {
    let id = SurfaceId(state.next_surface_id);
    state.next_surface_id = state.next_surface_id.saturating_add(1);
    id
}

fn focus_surface_internal(
    state: &mut SurfacesState,
    surface_id: SurfaceId,
) -> Result<(), ReducerError> {
    if !state.surfaces.iter().any(|surface| surface.id == surface_id) {
        return Err(ReducerError::SurfaceNotFound);
    }
    for surface in &mut state.surfaces {
        surface.is_focused = surface.id == surface_id;
    }
    Ok(())
}

fn normalize_focus(state: &mut SurfacesState) {
    if state.surfaces.iter().any(|surface| surface.is_focused) {
        return;
    }
    if let Some(last) = state.surfaces.last_mut() {
        last.is_focused = true;
    }
}

#[cfg(test)]
mod tests {
    use platform_host::StorageAreaName;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::config::InspectorConfig;

    fn open(state: &mut SurfacesState, kind: SurfaceKind) -> (SurfaceId, Vec<SurfaceEffect>) {
        let effects = reduce_surfaces(
            state,
            SurfaceAction::OpenSurface(OpenSurfaceRequest::new(InspectorConfig {
                surface_kind: kind,
                ..InspectorConfig::default()
            })),
        )
        .expect("open surface");
        (state.surfaces.last().expect("surface").id, effects)
    }

    #[test]
    fn open_surface_focuses_new_surface_and_mounts_inspector() {
        let mut state = SurfacesState::default();

        let (first, _) = open(&mut state, SurfaceKind::Tab);
        let (second, effects) = open(&mut state, SurfaceKind::Tab);

        assert_eq!(effects, vec![SurfaceEffect::MountInspector(second)]);
        assert_eq!(state.focused_surface_id(), Some(second));
        assert_eq!(
            state.tabs().map(|surface| surface.id).collect::<Vec<_>>(),
            vec![first, second]
        );
        assert_eq!(state.surfaces[0].title, "Storage: local");
    }

    #[test]
    fn opening_a_popup_replaces_the_previous_popup() {
        let mut state = SurfacesState::default();
        let (tab, _) = open(&mut state, SurfaceKind::Tab);
        let (first_popup, _) = open(&mut state, SurfaceKind::Popup);

        let (second_popup, effects) = open(&mut state, SurfaceKind::Popup);

        assert_eq!(
            effects,
            vec![
                SurfaceEffect::ReleaseInspector(first_popup),
                SurfaceEffect::MountInspector(second_popup),
            ]
        );
        assert_eq!(state.popup().map(|surface| surface.id), Some(second_popup));
        assert!(state.surface(tab).is_some());
        assert_eq!(state.surfaces.len(), 2);
    }

    #[test]
    fn closing_focused_surface_refocuses_latest_remaining() {
        let mut state = SurfacesState::default();
        let (first, _) = open(&mut state, SurfaceKind::Tab);
        let (second, _) = open(&mut state, SurfaceKind::Tab);
        let (third, _) = open(&mut state, SurfaceKind::Tab);
        reduce_surfaces(&mut state, SurfaceAction::FocusSurface { surface_id: first })
            .expect("focus");

        let effects = reduce_surfaces(&mut state, SurfaceAction::CloseSurface { surface_id: first })
            .expect("close");

        assert_eq!(effects, vec![SurfaceEffect::ReleaseInspector(first)]);
        assert_eq!(state.focused_surface_id(), Some(third));
        assert!(state.surface(second).is_some());
    }

    #[test]
    fn missing_surfaces_are_rejected() {
        let mut state = SurfacesState::default();
        assert_eq!(
            reduce_surfaces(
                &mut state,
                SurfaceAction::CloseSurface {
                    surface_id: SurfaceId(9)
                }
            ),
            Err(ReducerError::SurfaceNotFound)
        );
        assert_eq!(
            reduce_surfaces(
                &mut state,
                SurfaceAction::FocusSurface {
                    surface_id: SurfaceId(9)
                }
            ),
            Err(ReducerError::SurfaceNotFound)
        );
    }

    #[test]
    fn title_override_and_config_are_recorded() {
        let mut state = SurfacesState::default();
        let config = InspectorConfig {
            storage_area: StorageAreaName::session(),
            base_filter: Some("app.".into()),
            ..InspectorConfig::default()
        };
        reduce_surfaces(
            &mut state,
            SurfaceAction::OpenSurface(OpenSurfaceRequest {
                config: config.clone(),
                title: Some("Session keys".into()),
            }),
        )
        .expect("open");

        let record = state.surfaces.last().expect("surface");
        assert_eq!(record.title, "Session keys");
        assert_eq!(record.config, config);
        assert_eq!(record.kind, SurfaceKind::Tab);
    }
}
