use std::cell::RefCell;
use std::rc::Rc;

use gtk4 as gtk;
use gtk4::prelude::*;
use libadwaita as adw;

use lottery::{GamePhase, Item};

use super::state::AppState;

pub fn build_status_bar(state: &Rc<RefCell<AppState>>) -> gtk::Box {
    let bar = gtk::Box::new(gtk::Orientation::Vertical, 6);
    bar.set_halign(gtk::Align::Center);
    bar.add_css_class("lottery-status");

    let status_label = gtk::Label::builder()
        .label(phase_text(GamePhase::Idle))
        .halign(gtk::Align::Center)
        .css_classes(vec!["title-4"])
        .build();

    let winners_label = gtk::Label::builder()
        .label("")
        .halign(gtk::Align::Center)
        .wrap(true)
        .css_classes(vec!["lottery-winners"])
        .build();
    winners_label.set_visible(false);

    bar.append(&status_label);
    bar.append(&winners_label);

    let mut st = state.borrow_mut();
    st.status_label = Some(status_label);
    st.winners_label = Some(winners_label);
    bar
}

pub fn phase_text(phase: GamePhase) -> &'static str {
    match phase {
        GamePhase::Idle => "Press Start to draw",
        GamePhase::Shuffling => "Shuffling...",
        GamePhase::Dealing => "Dealing...",
        GamePhase::Waiting => "Pick a card",
        GamePhase::Revealing => "Revealing...",
        GamePhase::Finished => "All cards revealed",
    }
}

pub fn update_status(st: &AppState, phase: GamePhase) {
    if let Some(label) = &st.status_label {
        label.set_text(phase_text(phase));
    }
    if let Some(button) = &st.start_button {
        button.set_sensitive(phase.accepts_start());
    }
    if phase != GamePhase::Finished {
        if let Some(label) = &st.winners_label {
            label.set_visible(false);
        }
    }
}

pub fn show_winners(st: &AppState, winners: &[Item]) {
    let Some(label) = &st.winners_label else {
        return;
    };
    let names: Vec<&str> = winners.iter().map(|w| w.name.as_str()).collect();
    let text = match names.len() {
        0 => "No winners".to_string(),
        1 => format!("Winner: {}", names[0]),
        _ => format!("Winners: {}", names.join(", ")),
    };
    let text = if st.debug {
        let metrics = st.machine.engine().cache().borrow().metrics();
        format!(
            "{text}\nlayout cache: {} hits, {} misses, {:.2} ms avg",
            metrics.hits, metrics.misses, metrics.average_calculation_ms
        )
    } else {
        text
    };
    label.set_text(&text);
    label.set_visible(true);
}

pub fn show_toast(st: &AppState, message: &str) {
    if let Some(toasts) = &st.toasts {
        toasts.add_toast(adw::Toast::new(message));
    }
}
