use bloons_revenge::upgrades::{UpgradeId, UpgradeKind, upgrade_def};
use yew::prelude::*;

#[derive(Properties, PartialEq, Clone)]
pub struct UpgradeModalProps {
    pub show: bool,
    pub choices: Vec<UpgradeId>,
    pub on_select: Callback<UpgradeId>,
}

#[function_component]
pub fn UpgradeModal(props: &UpgradeModalProps) -> Html {
    if !props.show {
        return html! {};
    }
    let cards = props.choices.iter().filter_map(|id| upgrade_def(*id)).map(|def| {
        let id = def.id;
        let onclick = {
            let cb = props.on_select.clone();
            Callback::from(move |_| cb.emit(id))
        };
        let lifetime = match def.kind {
            UpgradeKind::Permanent => "Permanent".to_string(),
            UpgradeKind::Temporary { levels } => format!("{} levels", levels),
        };
        html! {
            <button {onclick} style="flex:1; min-width:160px; background:#0d1117; border:1px solid #30363d; border-radius:10px; padding:14px; color:#c9d1d9; display:flex; flex-direction:column; gap:8px; text-align:left; cursor:pointer;">
                <div style="font-size:28px;">{ def.icon }</div>
                <div style="font-weight:600;">{ def.name }</div>
                <div style="font-size:12px; opacity:0.85;">{ def.description }</div>
                <div style="font-size:11px; color:#a371f7;">{ lifetime }</div>
            </button>
        }
    });
    html! {<div style="position:absolute; inset:0; display:flex; align-items:center; justify-content:center; background:rgba(0,0,0,0.55); z-index:50;">
        <div style="background:#161b22; border:1px solid #30363d; border-radius:12px; padding:16px 20px; max-width:640px; display:flex; flex-direction:column; gap:14px;">
            <h3 style="margin:0; font-size:18px;">{"Choose an Upgrade"}</h3>
            <div style="display:flex; gap:12px; flex-wrap:wrap;">{ for cards }</div>
        </div>
    </div>}
}
