use std::collections::HashMap;

use crate::clamp_zoom;

pub type PointerId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Touch,
    Mouse,
    Pen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub id: PointerId,
    pub kind: PointerKind,
    pub phase: PointerPhase,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureUpdate {
    None,
    /// Scale changed; update state and indicator, no repaint yet.
    Preview { scale: f32 },
    /// Scale moved past the repaint threshold; update state and repaint.
    Repaint { scale: f32 },
    /// Gesture ended; one final repaint at the settled scale.
    Settle,
}

#[derive(Debug, Clone, Copy)]
struct PinchState {
    ids: [PointerId; 2],
    start_distance: f32,
    start_scale: f32,
    last_rendered_scale: f32,
}

#[derive(Debug, Default)]
pub struct GestureTracker {
    pointers: HashMap<PointerId, (f32, f32)>,
    pinch: Option<PinchState>,
}

impl GestureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pinch_active(&self) -> bool {
        self.pinch.is_some()
    }

    pub fn reset(&mut self) {
        self.pointers.clear();
        self.pinch = None;
    }

    pub fn handle(
        &mut self,
        event: PointerEvent,
        current_scale: f32,
        threshold: f32,
    ) -> GestureUpdate {
        if event.kind != PointerKind::Touch {
            return GestureUpdate::None;
        }
        match event.phase {
            PointerPhase::Down => {
                self.pointers.insert(event.id, (event.x, event.y));
                if self.pinch.is_none() && self.pointers.len() == 2 {
                    let other = self
                        .pointers
                        .keys()
                        .copied()
                        .find(|id| *id != event.id)
                        .unwrap_or(event.id);
                    let ids = [other, event.id];
                    let start_distance = self.distance(ids).unwrap_or(0.0);
                    self.pinch = Some(PinchState {
                        ids,
                        start_distance,
                        start_scale: current_scale,
                        last_rendered_scale: current_scale,
                    });
                }
                GestureUpdate::None
            }
            PointerPhase::Move => {
                if !self.pointers.contains_key(&event.id) {
                    return GestureUpdate::None;
                }
                self.pointers.insert(event.id, (event.x, event.y));
                if self.pointers.len() != 2 {
                    return GestureUpdate::None;
                }
                let Some(pinch) = self.pinch.as_mut() else {
                    return GestureUpdate::None;
                };
                if pinch.start_distance <= f32::EPSILON {
                    return GestureUpdate::None;
                }
                let ids = pinch.ids;
                let Some(distance) = distance_between(&self.pointers, ids) else {
                    return GestureUpdate::None;
                };
                let scale = clamp_zoom(pinch.start_scale * distance / pinch.start_distance);
                if (scale - pinch.last_rendered_scale).abs() > threshold {
                    pinch.last_rendered_scale = scale;
                    GestureUpdate::Repaint { scale }
                } else {
                    GestureUpdate::Preview { scale }
                }
            }
            PointerPhase::Up | PointerPhase::Cancel => {
                self.pointers.remove(&event.id);
                if self.pinch.is_some() && self.pointers.len() < 2 {
                    self.pinch = None;
                    GestureUpdate::Settle
                } else {
                    GestureUpdate::None
                }
            }
        }
    }

    fn distance(&self, ids: [PointerId; 2]) -> Option<f32> {
        distance_between(&self.pointers, ids)
    }
}

fn distance_between(
    pointers: &HashMap<PointerId, (f32, f32)>,
    ids: [PointerId; 2],
) -> Option<f32> {
    let (ax, ay) = pointers.get(&ids[0])?;
    let (bx, by) = pointers.get(&ids[1])?;
    Some(((ax - bx).powi(2) + (ay - by).powi(2)).sqrt())
}
