//! Command-only view of the renderer. The core never reads anything back.

use std::collections::BTreeMap;

use crate::model::{TowerKind, Vec2};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VisualHandle(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VisualKind {
    Bloon { clone: bool },
    Tower(TowerKind),
    Projectile,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EffectKind {
    Pop,
    ShieldBreak,
    Phase,
    Bounce,
    Mirror,
    Split,
    SniperBeam,
    FreezeWave,
    TeslaArc,
    Scorch,
    Jamming,
    Explosion,
    Lightning,
    Celebration,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EffectParams {
    pub radius: f64,
    /// Second endpoint for beams and arcs.
    pub to: Option<Vec2>,
}

pub trait Presentation {
    fn create_visual(&mut self, kind: VisualKind, position: Vec2) -> VisualHandle;
    fn move_visual(&mut self, handle: VisualHandle, position: Vec2);
    fn destroy_visual(&mut self, handle: VisualHandle);
    fn play_effect(&mut self, kind: EffectKind, position: Vec2, params: EffectParams);
}

#[derive(Clone, Debug, PartialEq)]
pub enum VisualCommand {
    Create { handle: VisualHandle, kind: VisualKind, position: Vec2 },
    Move { handle: VisualHandle, position: Vec2 },
    Destroy { handle: VisualHandle },
    Effect { kind: EffectKind, position: Vec2, params: EffectParams },
}

/// Records commands for the front-end. Moves are coalesced to the latest position
/// per handle so a frame never carries more than one move per visual.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VisualQueue {
    next_handle: u64,
    commands: Vec<VisualCommand>,
    moves: BTreeMap<VisualHandle, Vec2>,
}

impl VisualQueue {
    /// Drops everything recorded so far. Handles stay unique.
    pub fn begin_frame(&mut self) {
        self.commands.clear();
        self.moves.clear();
    }

    /// Commands recorded since the last `begin_frame`, moves last.
    pub fn commands(&self) -> Vec<VisualCommand> {
        let mut out = self.commands.clone();
        out.extend(self.moves.iter().map(|(handle, position)| VisualCommand::Move { handle: *handle, position: *position }));
        out
    }

    pub fn effects(&self) -> impl Iterator<Item = (EffectKind, Vec2, EffectParams)> + '_ {
        self.commands.iter().filter_map(|c| match c {
            VisualCommand::Effect { kind, position, params } => Some((*kind, *position, *params)),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.commands.len() + self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Presentation for VisualQueue {
    fn create_visual(&mut self, kind: VisualKind, position: Vec2) -> VisualHandle {
        self.next_handle += 1;
        let handle = VisualHandle(self.next_handle);
        self.commands.push(VisualCommand::Create { handle, kind, position });
        handle
    }

    fn move_visual(&mut self, handle: VisualHandle, position: Vec2) {
        self.moves.insert(handle, position);
    }

    fn destroy_visual(&mut self, handle: VisualHandle) {
        self.moves.remove(&handle);
        self.commands.push(VisualCommand::Destroy { handle });
    }

    fn play_effect(&mut self, kind: EffectKind, position: Vec2, params: EffectParams) {
        self.commands.push(VisualCommand::Effect { kind, position, params });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moves_coalesce_and_die_with_their_visual() {
        let mut q = VisualQueue::default();
        let a = q.create_visual(VisualKind::Projectile, Vec2::default());
        let b = q.create_visual(VisualKind::Bloon { clone: false }, Vec2::default());
        q.move_visual(a, Vec2::new(1.0, 0.0));
        q.move_visual(a, Vec2::new(2.0, 0.0));
        q.move_visual(b, Vec2::new(0.0, 1.0));
        q.destroy_visual(b);
        let cmds = q.commands();
        assert_eq!(cmds.len(), 4);
        assert_eq!(cmds.last(), Some(&VisualCommand::Move { handle: a, position: Vec2::new(2.0, 0.0) }));
    }

    #[test]
    fn handles_stay_unique_across_frames() {
        let mut q = VisualQueue::default();
        let a = q.create_visual(VisualKind::Projectile, Vec2::default());
        q.play_effect(EffectKind::Pop, Vec2::default(), EffectParams::default());
        assert_eq!(q.effects().count(), 1);
        q.begin_frame();
        assert!(q.is_empty());
        let b = q.create_visual(VisualKind::Projectile, Vec2::default());
        assert_ne!(a, b);
    }
}
