use dioxus::prelude::*;

mod api;
mod components;
mod db;
mod diagnostics;
mod error;
mod messages;
mod platform;
mod session;
mod utils;

use components::AppView;

const APP_CSS: Asset = asset!("/assets/styling/app.css");

fn main() {
    dioxus::launch(App);
}

#[component]
fn App() -> Element {
    rsx! {
        document::Meta { name: "theme-color", content: "#1f6f5c" }
        document::Meta { name: "mobile-web-app-capable", content: "yes" }
        document::Title { "VerseReader" }
        document::Stylesheet { href: APP_CSS }

        Router::<AppView> {}
    }
}
