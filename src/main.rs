use gtk4::glib;

mod ui {
    pub mod app;
    pub mod board;
    pub mod hud;
    pub mod state;
}

fn main() -> glib::ExitCode {
    lottery::logging::init();
    ui::app::run()
}
