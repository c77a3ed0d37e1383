//! Component trait — the interface every panel implements.
//!
//! Design principles:
//! - Components are self-contained: they own their view state (cursors,
//!   scroll offsets, input buffers) and render themselves.
//! - Components receive `AppState` (read-only) for data they don't own.
//! - Components produce `Vec<Action>` — they never mutate shared state
//!   directly. The App event loop dispatches those actions.

use ratatui::crossterm::event::KeyEvent;
use ratatui::{layout::Rect, Frame};

use crate::action::{Action, ComponentId};
use crate::app_state::AppState;

pub trait Component {
    /// Which component is this?
    fn id(&self) -> ComponentId;

    /// Handle a key event. Returns actions to be dispatched.
    /// Only called when this component has focus (or for global keys).
    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action>;

    /// Receive an action dispatched by the App.
    /// Components can react to actions even when not focused.
    fn on_action(&mut self, _action: &Action, _state: &AppState) -> Vec<Action> {
        Vec::new()
    }

    /// Called each UI tick (~100ms). For time-based updates.
    fn tick(&mut self, _state: &AppState) -> Vec<Action> {
        Vec::new()
    }

    /// Render the component into `area`.
    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState);
}
