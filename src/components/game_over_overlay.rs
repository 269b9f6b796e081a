use bloons_revenge::leaderboard::{Leaderboard, ScoreRecord};
use web_sys::HtmlInputElement;
use yew::prelude::*;

use crate::state::LocalStorageScores;
use crate::util::{clog, now_ms};

#[derive(Properties, PartialEq, Clone)]
pub struct GameOverOverlayProps {
    pub show: bool,
    pub score: u64,
    pub level: u32,
    pub restart: Callback<()>,
}

fn top_scores() -> Vec<ScoreRecord> {
    Leaderboard::new(LocalStorageScores).top_scores(10)
}

#[function_component]
pub fn GameOverOverlay(props: &GameOverOverlayProps) -> Html {
    let name = use_state(String::new);
    let submitted = use_state(|| false);
    let scores = use_state(top_scores);
    let qualifies = use_state(|| false);

    // A new game over gets a fresh entry form.
    {
        let submitted = submitted.clone();
        let scores = scores.clone();
        let qualifies = qualifies.clone();
        let score = props.score;
        use_effect_with(props.show, move |show| {
            if *show {
                submitted.set(false);
                scores.set(top_scores());
                qualifies.set(score > 0 && Leaderboard::new(LocalStorageScores).is_high_score(score));
            }
            || ()
        });
    }

    if !props.show {
        return html! {};
    }
    let on_input = {
        let name = name.clone();
        Callback::from(move |e: InputEvent| {
            let input: HtmlInputElement = e.target_unchecked_into();
            name.set(input.value());
        })
    };
    let submit = {
        let name = name.clone();
        let submitted = submitted.clone();
        let scores = scores.clone();
        let (score, level) = (props.score, props.level);
        Callback::from(move |_| {
            let mut board = Leaderboard::new(LocalStorageScores);
            match board.add_score(&name, score, level, now_ms()) {
                Some(rank) => clog(&format!("high score #{} for {}", rank, name.trim())),
                None => clog("score not recorded"),
            }
            submitted.set(true);
            scores.set(board.top_scores(10));
        })
    };
    let restart_btn = {
        let cb = props.restart.clone();
        Callback::from(move |_| cb.emit(()))
    };
    let rows = scores.iter().enumerate().map(|(i, r)| {
        html! {
            <tr>
                <td>{ i + 1 }</td>
                <td style="text-align:left;">{ r.name.clone() }</td>
                <td>{ r.score }</td>
                <td>{ r.level }</td>
            </tr>
        }
    });
    html! {
        <div style="position:absolute; top:50%; left:50%; transform:translate(-50%, -50%); background:rgba(0,0,0,0.85); border:2px solid #f85149; padding:24px 32px; border-radius:12px; text-align:center; min-width:320px;">
            <h2 style="margin:0 0 12px 0; color:#f85149;">{"Game Over"}</h2>
            <p style="margin:4px 0;">{ format!("Final Score: {}", props.score) }</p>
            <p style="margin:4px 0;">{ format!("Reached Level: {}", props.level) }</p>
            if *qualifies && !*submitted {
                <p style="margin:8px 0 0 0; color:#d4af37; font-weight:bold;">{"New High Score!"}</p>
                <div style="margin-top:12px; display:flex; gap:8px; justify-content:center;">
                    <input type="text" placeholder="Your name" maxlength="20" value={(*name).clone()} oninput={on_input} />
                    <button onclick={submit} disabled={name.trim().is_empty() || props.score == 0}>{"Save Score"}</button>
                </div>
            }
            if !scores.is_empty() {
                <table style="margin:12px auto 0 auto; font-size:13px; border-spacing:10px 2px;">
                    <tr><th>{"#"}</th><th>{"Name"}</th><th>{"Score"}</th><th>{"Level"}</th></tr>
                    { for rows }
                </table>
            }
            <div style="margin-top:16px; display:flex; gap:12px; justify-content:center;">
                <button onclick={restart_btn}>{"Play Again"}</button>
            </div>
        </div>
    }
}
