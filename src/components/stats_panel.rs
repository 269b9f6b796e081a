use yew::prelude::*;

#[derive(Properties, PartialEq, Clone)]
pub struct StatsPanelProps {
    pub level: u32,
    pub score: u64,
    pub theme: &'static str,
    pub escaped: u32,
    pub required: u32,
    pub active: u32,
    pub remaining: u32,
    pub destroyed: u32,
    pub retries: u32,
}

#[function_component]
pub fn StatsPanel(props: &StatsPanelProps) -> Html {
    let row_style = "display:flex; align-items:center; gap:8px;"; // icon | label | value
    let icon_style = "width:20px; text-align:center; flex-shrink:0;";
    let label_style = "flex:1; font-weight:500;";
    let value_style =
        "min-width:70px; text-align:right; font-variant-numeric:tabular-nums; font-weight:600;";
    let row = |icon: &str, label: &str, value: String, color: &str| {
        html! {
            <div style={row_style}>
                <span style={format!("{} color:{};", icon_style, color)}>{ icon.to_string() }</span>
                <span style={format!("{} color:{};", label_style, color)}>{ label.to_string() }</span>
                <span style={format!("{} color:{};", value_style, color)}>{ value }</span>
            </div>
        }
    };
    html! {
        <div style="position:absolute; top:12px; left:12px; background:rgba(22,27,34,0.9); border:1px solid #30363d; border-radius:8px; padding:10px 14px; min-width:230px; display:flex; flex-direction:column; gap:10px; font-size:14px;">
            { row("🏁", "Level", format!("{} · {}", props.level, props.theme), "#c9d1d9") }
            { row("⭐", "Score", props.score.to_string(), "#d4af37") }
            { row("🎈", "Escaped", format!("{}/{}", props.escaped, props.required), "#3fb950") }
            { row("🛫", "On Path", props.active.to_string(), "#58a6ff") }
            { row("📦", "To Spawn", props.remaining.to_string(), "#8b949e") }
            { row("💥", "Popped", props.destroyed.to_string(), "#f85149") }
            if props.retries > 0 {
                { row("🔁", "Retries", props.retries.to_string(), "#a371f7") }
            }
        </div>
    }
}
