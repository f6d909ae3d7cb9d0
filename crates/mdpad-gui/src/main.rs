#![forbid(unsafe_code)]
#![cfg_attr(
    all(not(debug_assertions), target_os = "windows"),
    windows_subsystem = "windows"
)]

#[cfg(target_arch = "wasm32")]
compile_error!("mdpad is a native desktop app; web/wasm builds are not supported.");

use std::{ffi::OsString, path::PathBuf};

use eframe::egui;
use log::{info, warn};
use mdpad_core::{
    CloseState, Dialogs, DocumentSession, SaveOutcome,
    config::{Layout, Settings},
    events,
};

mod dialogs;
mod preview;

use dialogs::NativeDialogs;
use preview::PreviewPane;

#[derive(Clone, Debug, PartialEq, Eq)]
struct LaunchOptions {
    layout: Option<Layout>,
    path: Option<PathBuf>,
}

fn parse_launch_options<I, S>(args: I) -> LaunchOptions
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    let mut layout = None;
    let mut path = None;

    for arg in args {
        let arg = arg.into();
        if arg == "-s" {
            layout = Some(Layout::SideBySide);
            continue;
        }
        if arg == "-v" {
            layout = Some(Layout::Stacked);
            continue;
        }

        if path.is_none() {
            path = Some(PathBuf::from(arg));
        }
    }

    LaunchOptions { layout, path }
}

fn init_logging(settings: &Settings) {
    let env = env_logger::Env::default().default_filter_or(settings.log.level.as_str());
    env_logger::Builder::from_env(env).init();
}

fn main() -> eframe::Result {
    let settings = Settings::load_default();
    let settings_error = settings.as_ref().err().map(ToString::to_string);
    let settings = settings.unwrap_or_default();
    init_logging(&settings);
    if let Some(err) = settings_error {
        warn!("{err}; using default settings");
    }

    let launch_options = parse_launch_options(std::env::args_os().skip(1));
    let app = MdpadApp::new(settings, launch_options);

    // Viewport sizes are in points, so they scale with the OS DPI factor.
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("mdpad")
            .with_inner_size([800.0, 600.0])
            .with_min_inner_size([400.0, 300.0]),
        ..Default::default()
    };
    eframe::run_native("mdpad", options, Box::new(move |_cc| Ok(Box::new(app))))
}

/// Every user-facing action, whether it came from the menu or a shortcut.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Command {
    New,
    Open,
    Save,
    SaveAs,
    Exit,
    ToggleLayout,
}

struct MdpadApp {
    session: DocumentSession,
    /// What the text widget edits. The session gets a copy through the text-changed event.
    editor_text: String,
    preview: PreviewPane,
    dialogs: NativeDialogs,
    settings: Settings,
    layout: Layout,
    error: Option<String>,
}

impl MdpadApp {
    fn new(settings: Settings, options: LaunchOptions) -> Self {
        let mut app = Self {
            session: DocumentSession::new(),
            editor_text: String::new(),
            preview: PreviewPane::default(),
            dialogs: NativeDialogs::new(settings.editor.extensions.clone()),
            layout: options.layout.unwrap_or(settings.editor.layout),
            settings,
            error: None,
        };
        if let Some(path) = options.path {
            app.open_path(path);
        }
        app
    }

    fn run(&mut self, ctx: &egui::Context, command: Command) {
        match command {
            Command::New => {
                if self.confirm_discard() {
                    self.session = DocumentSession::new();
                    self.error = None;
                    self.sync_from_session();
                }
            }
            Command::Open => self.open_file(),
            Command::Save => self.save(false),
            Command::SaveAs => self.save(true),
            Command::Exit => ctx.send_viewport_cmd(egui::ViewportCommand::Close),
            Command::ToggleLayout => self.layout = self.layout.toggle(),
        }
    }

    /// Run the unsaved-changes guard. `true` means the current document may be dropped.
    fn confirm_discard(&mut self) -> bool {
        let policy = self.settings.close.on_save_failure;
        match self.session.close_with(&mut self.dialogs, policy) {
            Ok(CloseState::Closed) => true,
            Ok(_) => false,
            Err(err) => {
                self.error = Some(format!("Save failed: {err}"));
                false
            }
        }
    }

    fn open_file(&mut self) {
        let Some(path) = self.dialogs.pick_open_path() else {
            return;
        };

        if self.confirm_discard() {
            self.open_path(path);
            // A failed load leaves the old document in place, so it must be editable again.
            self.session.resume();
        }
    }

    fn open_path(&mut self, path: PathBuf) {
        match self.session.load(path) {
            Ok(()) => {
                self.error = None;
                self.sync_from_session();
            }
            Err(err) => {
                warn!("{err}");
                self.dialogs.notify_error(&err.to_string());
                self.error = Some(format!("Open failed: {err}"));
            }
        }
    }

    fn save(&mut self, save_as: bool) {
        let result = if save_as {
            match self.dialogs.pick_save_path() {
                Some(path) => self
                    .session
                    .save_as(path.clone())
                    .map(|()| SaveOutcome::Saved(path)),
                None => Ok(SaveOutcome::Cancelled),
            }
        } else {
            self.session.save(&mut self.dialogs)
        };

        match result {
            Ok(SaveOutcome::Saved(_)) => self.error = None,
            Ok(SaveOutcome::Cancelled) => {}
            Err(err) => {
                self.dialogs.notify_error(&err.to_string());
                self.error = Some(format!("Save failed: {err}"));
            }
        }
    }

    /// Push the session's buffer into the widgets after it was replaced wholesale.
    fn sync_from_session(&mut self) {
        self.session.text().clone_into(&mut self.editor_text);
        self.preview.refresh(&self.editor_text);
    }

    fn shortcut_commands(ctx: &egui::Context) -> Vec<Command> {
        ctx.input(|i| {
            let cmd = i.modifiers.command;
            let shift = i.modifiers.shift;
            [
                (cmd && i.key_pressed(egui::Key::N), Command::New),
                (cmd && i.key_pressed(egui::Key::O), Command::Open),
                (cmd && !shift && i.key_pressed(egui::Key::S), Command::Save),
                (cmd && shift && i.key_pressed(egui::Key::S), Command::SaveAs),
                (cmd && i.key_pressed(egui::Key::Q), Command::Exit),
                (cmd && i.key_pressed(egui::Key::Enter), Command::ToggleLayout),
            ]
            .into_iter()
            .filter_map(|(pressed, command)| pressed.then_some(command))
            .collect()
        })
    }

    fn show_menu(ui: &mut egui::Ui) -> Option<Command> {
        let mut chosen = None;
        ui.horizontal(|ui| {
            ui.menu_button("File", |ui| {
                let items = [
                    ("New", "Ctrl+N", Command::New),
                    ("Open\u{2026}", "Ctrl+O", Command::Open),
                    ("Save", "Ctrl+S", Command::Save),
                    ("Save As\u{2026}", "Ctrl+Shift+S", Command::SaveAs),
                ];
                for (label, shortcut, command) in items {
                    if ui
                        .add(egui::Button::new(label).shortcut_text(shortcut))
                        .clicked()
                    {
                        chosen = Some(command);
                    }
                }
                ui.separator();
                if ui
                    .add(egui::Button::new("Exit").shortcut_text("Ctrl+Q"))
                    .clicked()
                {
                    chosen = Some(Command::Exit);
                }
            });
        });
        chosen
    }

    fn show_status(&mut self, ui: &mut egui::Ui) -> Option<Command> {
        let mut chosen = None;
        let mut clear_error = false;

        ui.horizontal(|ui| {
            if ui
                .button(self.layout.label())
                .on_hover_text("Toggle layout (Ctrl+Enter)")
                .clicked()
            {
                chosen = Some(Command::ToggleLayout);
            }
            ui.checkbox(&mut self.preview.show_source, "HTML");

            ui.separator();
            ui.label(self.session.path_label());

            if self.session.is_dirty() {
                ui.separator();
                ui.colored_label(ui.visuals().warn_fg_color, "Modified");
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if let Some(error) = self.error.as_deref() {
                    if ui.button("x").clicked() {
                        clear_error = true;
                    }
                    ui.colored_label(ui.visuals().error_fg_color, error);
                }
            });
        });

        if clear_error {
            self.error = None;
        }
        chosen
    }

    fn show_editor(&mut self, ui: &mut egui::Ui) {
        let editor = egui::TextEdit::multiline(&mut self.editor_text)
            .desired_width(f32::INFINITY)
            .font(egui::TextStyle::Monospace)
            .frame(false)
            .id(egui::Id::new("editor"));

        let response = egui::ScrollArea::vertical()
            .id_salt("editor")
            .auto_shrink([false; 2])
            .show(ui, |ui| ui.add_sized(ui.available_size(), editor))
            .inner;

        if response.changed() {
            events::broadcast(&self.editor_text, &mut [&mut self.session, &mut self.preview]);
        }
    }

    fn update_viewport_title(&self, ctx: &egui::Context) {
        ctx.send_viewport_cmd(egui::ViewportCommand::Title(format!(
            "mdpad \u{2014} {}{}",
            self.session.title(),
            if self.session.is_dirty() { "*" } else { "" },
        )));
    }
}

impl eframe::App for MdpadApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let mut commands = Self::shortcut_commands(ctx);

        let menu = egui::TopBottomPanel::top("menu").show(ctx, |ui| Self::show_menu(ui));
        commands.extend(menu.inner);

        let status = egui::TopBottomPanel::bottom("status").show(ctx, |ui| self.show_status(ui));
        commands.extend(status.inner);

        let panel_frame = egui::Frame::NONE
            .fill(ctx.style().visuals.panel_fill)
            .inner_margin(egui::Margin::same(4));
        match self.layout {
            Layout::Stacked => {
                egui::TopBottomPanel::bottom("preview")
                    .resizable(true)
                    .min_height(120.0)
                    .default_height(280.0)
                    .frame(panel_frame)
                    .show(ctx, |ui| self.preview.show(ui));
            }
            Layout::SideBySide => {
                egui::SidePanel::right("preview")
                    .resizable(true)
                    .min_width(240.0)
                    .default_width(400.0)
                    .frame(panel_frame)
                    .show(ctx, |ui| self.preview.show(ui));
            }
        }

        egui::CentralPanel::default()
            .frame(panel_frame)
            .show(ctx, |ui| self.show_editor(ui));

        for command in commands {
            self.run(ctx, command);
        }

        if ctx.input(|i| i.viewport().close_requested()) {
            if self.session.close_state().is_closed() || self.confirm_discard() {
                info!("exiting");
            } else {
                ctx.send_viewport_cmd(egui::ViewportCommand::CancelClose);
            }
        }

        self.update_viewport_title(ctx);
    }
}
