use std::rc::Rc;

use tracing::debug;
use yew::prelude::*;

use crate::game::{Game, IntentError};
use crate::model::{AbilityKind, BloonId, Vec2};
use crate::upgrades::UpgradeId;

#[derive(Clone, Debug, PartialEq)]
pub enum GameAction {
    Tick { dt_ms: u64 },
    SelectAbility(AbilityKind),
    BloonClicked { id: BloonId },
    /// Ground-plane click; resolves to the nearest bloon.
    ClickAt { pos: Vec2 },
    FinishClearAnimation,
    SelectUpgrade(UpgradeId),
    Continue,
    Restart,
}

impl Game {
    /// Applies one UI action. Rejected intents leave the game as it was apart from
    /// `last_rejection`.
    pub fn apply_action(&mut self, action: GameAction) {
        use GameAction::*;
        let result: Result<(), IntentError> = match action {
            Tick { dt_ms } => {
                self.tick(dt_ms);
                Ok(())
            }
            SelectAbility(kind) => self.select_ability(kind),
            BloonClicked { id } => self.bloon_clicked(id).map(|_| ()),
            ClickAt { pos } => self.click_at(pos).map(|_| ()),
            FinishClearAnimation => self.finish_clear_animation(),
            SelectUpgrade(id) => self.select_upgrade(id),
            Continue => self.request_continue(),
            Restart => self.request_restart(),
        };
        match result {
            Ok(()) => {}
            Err(e) => {
                debug!(error = %e, "intent rejected");
                self.last_rejection = Some(e.to_string());
            }
        }
    }
}

impl Reducible for Game {
    type Action = GameAction;

    fn reduce(self: Rc<Self>, action: Self::Action) -> Rc<Self> {
        let mut new = (*self).clone();
        new.apply_action(action);
        Rc::new(new)
    }
}
