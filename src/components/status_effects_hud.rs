use bloons_revenge::game::{ActiveModifier, Notification};
use bloons_revenge::upgrades::{UpgradeId, upgrade_def};
use yew::prelude::*;

#[derive(Properties, PartialEq, Clone)]
pub struct StatusEffectsHudProps {
    pub active: Vec<ActiveModifier>,
    pub notifications: Vec<Notification>,
    /// Every pick this run, oldest first.
    pub history: Vec<UpgradeId>,
}

#[function_component]
pub fn StatusEffectsHud(props: &StatusEffectsHudProps) -> Html {
    let modifiers = props.active.iter().map(|m| {
        let left = match m.levels_left {
            Some(n) => format!("{} lvl", n),
            None => "∞".to_string(),
        };
        html! {
            <div style="display:flex; gap:6px; align-items:center;">
                <span>{ m.icon }</span>
                <span style="flex:1;">{ m.name }</span>
                <span style="opacity:0.7; font-variant-numeric:tabular-nums;">{ left }</span>
            </div>
        }
    });
    let picks = props.history.iter().enumerate().filter_map(|(i, id)| {
        let def = upgrade_def(*id)?;
        Some(html! {
            <span key={i} title={format!("{}. {}", i + 1, def.name)} style="font-size:16px;">{ def.icon }</span>
        })
    });
    let notes = props.notifications.iter().map(|n| {
        html! { <div key={n.id} style="background:rgba(88,166,255,0.15); border-left:3px solid #58a6ff; padding:4px 8px; border-radius:4px;">{ n.message.clone() }</div> }
    });
    html! {
        <div style="position:absolute; top:12px; right:12px; display:flex; flex-direction:column; gap:8px; min-width:220px; font-size:13px;">
            if !props.active.is_empty() {
                <div style="background:rgba(22,27,34,0.9); border:1px solid #30363d; border-radius:8px; padding:8px 12px; display:flex; flex-direction:column; gap:4px;">
                    <div style="font-weight:600;">{"Upgrades"}</div>
                    { for modifiers }
                </div>
            }
            if !props.history.is_empty() {
                <div style="background:rgba(22,27,34,0.9); border:1px solid #30363d; border-radius:8px; padding:8px 12px;">
                    <div style="font-weight:600; margin-bottom:4px;">{ format!("History ({})", props.history.len()) }</div>
                    <div style="display:flex; flex-wrap:wrap; gap:4px;">{ for picks }</div>
                </div>
            }
            { for notes }
        </div>
    }
}
