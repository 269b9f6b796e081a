use wasm_bindgen::JsValue;

pub fn clog(msg: &str) {
    web_sys::console::log_1(&JsValue::from_str(msg));
}

/// Wall-clock milliseconds, for leaderboard timestamps only.
pub fn now_ms() -> u64 {
    js_sys::Date::now() as u64
}

pub fn format_secs(ms: u64) -> String {
    format!("{:.1}s", ms as f64 / 1000.0)
}
