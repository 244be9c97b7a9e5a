use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use gtk4 as gtk;
use gtk4::glib;
use gtk4::prelude::*;
use libadwaita as adw;
use tracing::{debug, info};

use lottery::{ChromeFlags, GameEvent, GamePhase};

use super::board::{self, CONTENT_MARGIN};
use super::hud;
use super::state::{AppState, DEFAULT_QUANTITY};

pub const APP_ID: &str = "io.github.lottery.Reveal";
const FRAME_MS: u64 = 16;

const CSS: &str = "
.lottery-card { padding: 0; border-radius: 12px; }
.lottery-card.revealed { background: alpha(@accent_bg_color, 0.15); }
.lottery-card.winner { background: @accent_bg_color; color: @accent_fg_color; }
.lottery-card.fallback { opacity: 0.85; }
.lottery-winners { font-weight: bold; }
";

pub fn run() -> glib::ExitCode {
    glib::set_prgname(Some(APP_ID));
    let app = adw::Application::builder().application_id(APP_ID).build();

    app.connect_activate(move |app| {
        load_css();

        let state = Rc::new(RefCell::new(AppState::new()));

        let title = gtk::Label::new(None);
        title.set_markup("<b>Lottery</b>");
        let header = adw::HeaderBar::builder().title_widget(&title).build();
        header.add_css_class("flat");

        let quantity = gtk::SpinButton::with_range(1.0, 20.0, 1.0);
        quantity.set_value(DEFAULT_QUANTITY as f64);
        quantity.set_tooltip_text(Some("Winners"));
        quantity.connect_value_changed({
            let state = state.clone();
            move |spin| {
                state.borrow_mut().quantity = spin.value_as_int().max(1) as usize;
            }
        });
        header.pack_start(&quantity);

        let repeat = gtk::CheckButton::with_label("Repeats");
        repeat.connect_toggled({
            let state = state.clone();
            move |check| {
                state.borrow_mut().allow_repeat = check.is_active();
            }
        });
        header.pack_start(&repeat);

        let start_button = gtk::Button::builder()
            .label("Start")
            .css_classes(vec!["suggested-action", "pill"])
            .halign(gtk::Align::Center)
            .build();
        start_button.connect_clicked({
            let state = state.clone();
            move |_| start_game(&state)
        });

        let board = board::build_board(&state);
        let status = hud::build_status_bar(&state);

        let content = gtk::Box::new(gtk::Orientation::Vertical, 12);
        content.set_margin_top(CONTENT_MARGIN);
        content.set_margin_bottom(CONTENT_MARGIN);
        content.set_margin_start(CONTENT_MARGIN);
        content.set_margin_end(CONTENT_MARGIN);
        content.append(&board);
        content.append(&status);
        content.append(&start_button);

        let toasts = adw::ToastOverlay::new();
        toasts.set_child(Some(&content));

        let toolbar = adw::ToolbarView::new();
        toolbar.set_hexpand(true);
        toolbar.set_vexpand(true);
        toolbar.add_top_bar(&header);
        toolbar.set_content(Some(&toasts));

        let win = adw::ApplicationWindow::builder()
            .application(app)
            .title("Lottery")
            .default_width(1024)
            .default_height(768)
            .content(&toolbar)
            .build();
        win.set_size_request(320, 480);

        {
            let mut st = state.borrow_mut();
            st.start_button = Some(start_button);
            st.toasts = Some(toasts);
        }

        win.connect_close_request({
            let state = state.clone();
            move |_| {
                shutdown(&state);
                glib::Propagation::Proceed
            }
        });

        start_frame_timer(&state);
        win.present();
    });

    app.run()
}

fn load_css() {
    let Some(display) = gtk::gdk::Display::default() else {
        return;
    };
    let provider = gtk::CssProvider::new();
    provider.load_from_data(CSS);
    gtk::style_context_add_provider_for_display(
        &display,
        &provider,
        gtk::STYLE_PROVIDER_PRIORITY_APPLICATION,
    );
}

fn start_frame_timer(state: &Rc<RefCell<AppState>>) {
    let state_tick = state.clone();
    let handle = glib::timeout_add_local(Duration::from_millis(FRAME_MS), move || {
        {
            let mut st = state_tick.borrow_mut();
            if !st.machine.is_alive() {
                st.frame_handle = None;
                return glib::ControlFlow::Break;
            }
            let elapsed = st.take_elapsed_ms();
            if elapsed > 0 {
                st.machine.tick(elapsed);
            }
        }
        process_events(&state_tick);
        glib::ControlFlow::Continue
    });
    state.borrow_mut().frame_handle = Some(handle);
}

fn shutdown(state: &Rc<RefCell<AppState>>) {
    let mut st = state.borrow_mut();
    st.machine.destroy();
    if let Some(handle) = st.frame_handle.take() {
        handle.remove();
    }
    debug!("lottery window closed");
}

fn start_game(state: &Rc<RefCell<AppState>>) {
    {
        let mut st = state.borrow_mut();
        let chrome = ChromeFlags {
            has_result_panel: false,
            has_warnings: false,
            ..st.machine.chrome()
        };
        st.machine.set_chrome(chrome);

        let items = st.items.clone();
        let (quantity, allow_repeat) = (st.quantity, st.allow_repeat);
        // Failures come back through the event log as well.
        if let Err(err) = st.machine.start(&items, quantity, allow_repeat) {
            debug!(error = %err, "start refused");
        } else {
            info!(quantity, allow_repeat, pool = items.len(), "round started");
        }
    }
    process_events(state);
}

pub(super) fn handle_card_click(state: &Rc<RefCell<AppState>>, id: usize) {
    let flipped = state.borrow_mut().machine.flip(id);
    if flipped {
        process_events(state);
    }
}

/// Applies queued machine notifications to the widgets.
fn process_events(state: &Rc<RefCell<AppState>>) {
    let events = state.borrow().events.drain();
    for event in events {
        match event {
            GameEvent::PhaseChanged(phase) => {
                if phase == GamePhase::Dealing {
                    board::rebuild_cards(state);
                }
                hud::update_status(&state.borrow(), phase);
            }
            GameEvent::CardDealt(id) | GameEvent::CardRevealed(id) => board::sync_card(state, id),
            GameEvent::PositionsChanged => board::sync_all(state),
            GameEvent::Completed(winners) => {
                {
                    let mut st = state.borrow_mut();
                    let chrome = ChromeFlags {
                        has_result_panel: true,
                        ..st.machine.chrome()
                    };
                    st.machine.set_chrome(chrome);
                }
                hud::show_winners(&state.borrow(), &winners);
            }
            GameEvent::LayoutWarning(message) => {
                {
                    let mut st = state.borrow_mut();
                    let chrome = ChromeFlags {
                        has_warnings: true,
                        ..st.machine.chrome()
                    };
                    st.machine.set_chrome(chrome);
                }
                hud::show_toast(&state.borrow(), &message);
            }
            GameEvent::Error(kind, message) => {
                debug!(?kind, "round error");
                hud::show_toast(&state.borrow(), &message);
            }
        }
    }
}
