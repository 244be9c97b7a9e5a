use std::cell::RefCell;
use std::rc::Rc;

use gtk4 as gtk;
use gtk4::pango;
use gtk4::prelude::*;

use lottery::margins::margins;
use lottery::{CardPosition, ChromeFlags, Size, classify};

use super::app::handle_card_click;
use super::state::AppState;

pub const CONTENT_MARGIN: i32 = 12;

/// Board surface: a drawing area that only reports its size, with the card
/// layer stacked on top of it.
pub fn build_board(state: &Rc<RefCell<AppState>>) -> gtk::Overlay {
    let overlay = gtk::Overlay::new();
    overlay.set_hexpand(true);
    overlay.set_vexpand(true);
    overlay.add_css_class("lottery-board");

    let surface = gtk::DrawingArea::builder().hexpand(true).vexpand(true).build();
    surface.connect_resize({
        let state = state.clone();
        move |_, width, height| {
            if width <= 0 || height <= 0 {
                return;
            }
            state
                .borrow_mut()
                .machine
                .on_resize(Size::new(width as f64, height as f64));
        }
    });
    overlay.set_child(Some(&surface));

    let fixed = gtk::Fixed::new();
    fixed.set_halign(gtk::Align::Fill);
    fixed.set_valign(gtk::Align::Fill);
    overlay.add_overlay(&fixed);

    state.borrow_mut().board = Some(fixed);
    overlay
}

// Centre of the margin-adjusted area, in board coordinates.
fn layout_origin(viewport: Size, chrome: ChromeFlags) -> (f64, f64) {
    let m = margins(classify(Some(viewport.width)), chrome);
    let avail_w = (viewport.width - m.horizontal()).max(0.0);
    let avail_h = (viewport.height - m.vertical()).max(0.0);
    (m.left + avail_w / 2.0, m.top + avail_h / 2.0)
}

fn board_offset(position: &CardPosition, origin: (f64, f64)) -> (f64, f64) {
    (origin.0 + position.left(), origin.1 + position.top())
}

/// Replaces every card widget with a fresh face-down one per dealt card.
pub fn rebuild_cards(state: &Rc<RefCell<AppState>>) {
    let (fixed, old) = {
        let mut st = state.borrow_mut();
        let Some(fixed) = st.board.clone() else {
            return;
        };
        (fixed, std::mem::take(&mut st.card_buttons))
    };
    for button in old {
        fixed.remove(&button);
    }

    let (positions, origin) = {
        let st = state.borrow();
        let positions: Vec<_> = st.machine.cards().iter().map(|c| (c.id, c.position)).collect();
        (positions, layout_origin(st.machine.layout_viewport(), st.machine.layout_chrome()))
    };

    let mut buttons = Vec::with_capacity(positions.len());
    for (index, (id, position)) in positions.into_iter().enumerate() {
        let button = build_card(state, index, id);
        button.set_size_request(position.card_width as i32, position.card_height as i32);
        button.set_visible(false);
        let (x, y) = board_offset(&position, origin);
        fixed.put(&button, x, y);
        buttons.push(button);
    }
    state.borrow_mut().card_buttons = buttons;
}

fn build_card(state: &Rc<RefCell<AppState>>, index: usize, id: usize) -> gtk::Button {
    let button = gtk::Button::builder().css_classes(vec!["lottery-card"]).build();

    let drawing_area = gtk::DrawingArea::builder().hexpand(true).vexpand(true).build();
    drawing_area.add_css_class("lottery-card-label");

    let state_draw = state.clone();
    drawing_area.set_draw_func(move |area, cr, width, height| {
        let Ok(st) = state_draw.try_borrow() else {
            return;
        };
        let Some(card) = st.machine.cards().get(index) else {
            return;
        };
        let text = match (&card.content, card.revealed) {
            (Some(item), true) => item.name.as_str(),
            (None, true) => "Blank",
            (_, false) => "?",
        };

        let min_dim = width.min(height) as f64;
        let font_size = if card.revealed { min_dim * 0.18 } else { min_dim * 0.34 };

        cr.set_antialias(gtk::cairo::Antialias::Best);
        cr.translate(width as f64 / 2.0, height as f64 / 2.0);
        cr.rotate(card.position.rotation.to_radians());

        let layout = pangocairo::functions::create_layout(cr);
        let mut font_desc = pango::FontDescription::new();
        font_desc.set_family("Cantarell, Noto Sans, sans");
        if !card.revealed || card.is_winner {
            font_desc.set_weight(pango::Weight::Bold);
        }
        font_desc.set_size((font_size * pango::SCALE as f64) as i32);
        layout.set_font_description(Some(&font_desc));
        layout.set_width(width * pango::SCALE);
        layout.set_alignment(pango::Alignment::Center);
        layout.set_wrap(pango::WrapMode::WordChar);
        layout.set_text(text);

        let fg = area.style_context().color();
        cr.set_source_rgba(
            fg.red() as f64,
            fg.green() as f64,
            fg.blue() as f64,
            fg.alpha() as f64,
        );

        let (text_width, text_height) = layout.pixel_size();
        cr.move_to(-(text_width as f64) / 2.0, -(text_height as f64) / 2.0);
        pangocairo::functions::show_layout(cr, &layout);
    });
    button.set_child(Some(&drawing_area));

    let state_click = state.clone();
    button.connect_clicked(move |_| {
        handle_card_click(&state_click, id);
    });
    button
}

/// Brings one card widget in line with the machine's view of it.
pub fn sync_card(state: &Rc<RefCell<AppState>>, index: usize) {
    let st = state.borrow();
    let (Some(fixed), Some(button), Some(card)) = (
        st.board.as_ref(),
        st.card_buttons.get(index),
        st.machine.cards().get(index),
    ) else {
        return;
    };
    let origin = layout_origin(st.machine.layout_viewport(), st.machine.layout_chrome());
    let (x, y) = board_offset(&card.position, origin);
    fixed.move_(button, x, y);
    button.set_size_request(card.position.card_width as i32, card.position.card_height as i32);
    button.set_visible(card.visible);
    set_class(button, "revealed", card.revealed);
    set_class(button, "winner", card.revealed && card.is_winner);
    set_class(button, "fallback", card.position.is_fallback);
    if let Some(child) = button.child() {
        child.queue_draw();
    }
}

pub fn sync_all(state: &Rc<RefCell<AppState>>) {
    let count = state.borrow().card_buttons.len();
    for index in 0..count {
        sync_card(state, index);
    }
}

fn set_class(widget: &impl IsA<gtk::Widget>, class: &str, on: bool) {
    if on {
        widget.add_css_class(class);
    } else {
        widget.remove_css_class(class);
    }
}
