mod components;
mod state;
mod util;

fn main() {
    // Route tracing events and panics to the browser console
    console_error_panic_hook::set_once();
    tracing_wasm::set_as_global_default_with_config(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(tracing::Level::DEBUG)
            .build(),
    );

    yew::Renderer::<components::app::App>::new().render();
}
