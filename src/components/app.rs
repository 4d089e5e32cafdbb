use crate::components::AppView;
use crate::platform::{default_ports, install_browser_listeners};
use crate::session::SessionController;
use dioxus::core::{Runtime, RuntimeGuard};
use dioxus::prelude::*;
use std::rc::Rc;

/// Bumped on every session change; components read it to re-render.
#[derive(Clone, Copy)]
pub struct SessionRevision(pub Signal<u64>);

#[component]
pub fn AppShell() -> Element {
    let session = use_hook(|| {
        let session = SessionController::new(default_ports());
        install_browser_listeners(&session);
        session
    });
    let revision = use_signal(|| 0u64);

    // Provide state via context
    use_context_provider(|| session.clone());
    use_context_provider(|| SessionRevision(revision));

    let subscription = use_hook({
        let session = session.clone();
        move || {
            let runtime = Runtime::current();
            session.subscribe(Rc::new(move || {
                let _guard = RuntimeGuard::new(runtime.clone());
                let mut revision = revision;
                revision += 1;
            }))
        }
    });

    use_drop({
        let session = session.clone();
        move || {
            session.unsubscribe(subscription);
            session.shutdown();
        }
    });

    let _ = revision();
    let locale = session.view().locale;
    let (dir, lang) = if locale.is_rtl() {
        ("rtl", "ar")
    } else {
        ("ltr", "en")
    };

    rsx! {
        div { class: "app-container", dir, lang,
            main { class: "reader-main", Outlet::<AppView> {} }
        }
    }
}
