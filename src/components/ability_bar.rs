use bloons_revenge::model::AbilityKind;
use yew::prelude::*;

use crate::util::format_secs;

#[derive(PartialEq, Clone, Copy)]
pub struct AbilitySlot {
    pub kind: AbilityKind,
    pub remaining_ms: u64,
    /// 1.0 right after use, 0.0 when ready.
    pub fraction: f64,
}

#[derive(Properties, PartialEq, Clone)]
pub struct AbilityBarProps {
    pub slots: Vec<AbilitySlot>,
    pub selected: Option<AbilityKind>,
    pub on_select: Callback<AbilityKind>,
}

fn icon(kind: AbilityKind) -> &'static str {
    match kind {
        AbilityKind::Shield => "🛡",
        AbilityKind::Speed => "💨",
        AbilityKind::Camo => "🥷",
        AbilityKind::Phase => "👻",
        AbilityKind::Fire => "🔥",
        AbilityKind::Mirror => "🪞",
        AbilityKind::Rubber => "🏀",
        AbilityKind::Split => "✂",
    }
}

#[function_component]
pub fn AbilityBar(props: &AbilityBarProps) -> Html {
    let buttons = props.slots.iter().enumerate().map(|(i, slot)| {
        let kind = slot.kind;
        let ready = slot.remaining_ms == 0;
        let onclick = {
            let cb = props.on_select.clone();
            Callback::from(move |_| cb.emit(kind))
        };
        let border = if props.selected == Some(kind) { "#d4af37" } else { "#30363d" };
        let shade = format!(
            "position:absolute; left:0; right:0; bottom:0; height:{:.0}%; background:rgba(0,0,0,0.6); pointer-events:none;",
            slot.fraction * 100.0
        );
        html! {
            <button {onclick} disabled={!ready} title={kind.label()}
                style={format!("position:relative; width:64px; height:64px; border:2px solid {}; border-radius:8px; background:#161b22; color:#c9d1d9; overflow:hidden;", border)}>
                <div style="font-size:22px;">{ icon(kind) }</div>
                <div style="font-size:10px;">{ format!("{} {}", i + 1, kind.label()) }</div>
                <div style={shade}></div>
                if !ready {
                    <div style="position:absolute; top:2px; right:4px; font-size:10px;">{ format_secs(slot.remaining_ms) }</div>
                }
            </button>
        }
    });
    html! {
        <div style="position:absolute; bottom:12px; left:50%; transform:translateX(-50%); background:rgba(22,27,34,0.9); border:1px solid #30363d; border-radius:8px; padding:8px; display:flex; gap:6px;">
            { for buttons }
        </div>
    }
}
