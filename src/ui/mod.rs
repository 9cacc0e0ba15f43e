pub mod answer;
pub mod command_bar;
pub mod error_popup;
pub mod help;
pub mod input;
pub mod model_picker;
pub mod question;
pub mod status_bar;

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout};

use crate::app::{App, AppMode, Overlay};

use answer::AnswerView;
use command_bar::CommandBar;
use error_popup::ErrorPopup;
use help::HelpView;
use model_picker::ModelPicker;
use question::QuestionBox;
use status_bar::StatusBar;

pub fn draw(frame: &mut Frame, app: &App) {
    let area = frame.area();

    // Layout: question box + answer panel + status bar + optional command bar
    let bottom_height = if app.mode == AppMode::Command { 2 } else { 1 };

    let [question_area, answer_area, bottom_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(1),
        Constraint::Length(bottom_height),
    ])
    .areas(area);

    frame.render_widget(QuestionBox::new(app), question_area);
    frame.render_widget(AnswerView::new(app), answer_area);

    if app.mode == AppMode::Command {
        let [status_area, cmd_area] =
            Layout::vertical([Constraint::Length(1), Constraint::Length(1)]).areas(bottom_area);
        frame.render_widget(StatusBar::new(app), status_area);
        frame.render_widget(CommandBar::new(app), cmd_area);
    } else {
        frame.render_widget(StatusBar::new(app), bottom_area);
    }

    match app.overlay {
        Some(Overlay::Help) => frame.render_widget(HelpView::new(), answer_area),
        Some(Overlay::ModelPicker) => frame.render_widget(ModelPicker::new(app), area),
        None => {}
    }

    // Error popup renders on top of everything.
    if let Some(ref error) = app.error {
        frame.render_widget(ErrorPopup::new(error), area);
    }
}
