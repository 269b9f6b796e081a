use bloons_revenge::model::GameStatus;
use yew::prelude::*;

#[derive(Properties, PartialEq, Clone)]
pub struct LevelCompleteOverlayProps {
    pub status: GameStatus,
    pub level: u32,
    pub score: u64,
    pub escaped: u32,
    pub destroyed: u32,
    pub on_continue: Callback<()>,
    pub on_skip_celebration: Callback<()>,
}

#[function_component]
pub fn LevelCompleteOverlay(props: &LevelCompleteOverlayProps) -> Html {
    match props.status {
        GameStatus::PerfectClear => {
            let skip = {
                let cb = props.on_skip_celebration.clone();
                Callback::from(move |_| cb.emit(()))
            };
            html! {
                <div onclick={skip} style="position:absolute; top:30%; left:50%; transform:translate(-50%, -50%); text-align:center; cursor:pointer;">
                    <h1 style="margin:0; font-size:48px; color:#d4af37; text-shadow:0 0 16px #d4af37;">{"PERFECT CLEAR!"}</h1>
                    <p style="margin:4px 0;">{ format!("Level {} · Score {}", props.level, props.score) }</p>
                </div>
            }
        }
        GameStatus::LevelComplete => {
            let next = {
                let cb = props.on_continue.clone();
                Callback::from(move |_| cb.emit(()))
            };
            html! {
                <div style="position:absolute; top:50%; left:50%; transform:translate(-50%, -50%); background:rgba(0,0,0,0.85); border:2px solid #3fb950; padding:24px 32px; border-radius:12px; text-align:center; min-width:320px;">
                    <h2 style="margin:0 0 12px 0; color:#3fb950;">{ format!("Level {} Complete", props.level) }</h2>
                    <p style="margin:4px 0;">{ format!("Escaped: {}", props.escaped) }</p>
                    <p style="margin:4px 0;">{ format!("Popped: {}", props.destroyed) }</p>
                    <p style="margin:4px 0;">{ format!("Score: {}", props.score) }</p>
                    <div style="margin-top:16px;">
                        <button onclick={next}>{"Next Level"}</button>
                    </div>
                </div>
            }
        }
        _ => html! {},
    }
}
