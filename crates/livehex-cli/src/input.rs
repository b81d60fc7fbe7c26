use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use tracing::debug;

use crate::shutdown::ShutdownSignal;

/// Stop `watch` on Esc, q or Ctrl+C.
///
/// Ctrl+C is handled here as well because raw terminal input may swallow
/// the signal before the `ctrlc` handler sees it.
pub fn spawn_keyboard_monitor(shutdown: Arc<ShutdownSignal>) -> JoinHandle<()> {
    thread::spawn(move || {
        debug!("Keyboard monitor started");

        while !shutdown.is_shutdown() {
            if event::poll(Duration::from_millis(100)).unwrap_or(false)
                && let Ok(Event::Key(key_event)) = event::read()
                && is_quit_key(&key_event)
            {
                debug!("Quit key pressed: {:?}", key_event.code);
                shutdown.trigger();
                break;
            }
        }

        debug!("Keyboard monitor stopped");
    })
}

fn is_quit_key(event: &KeyEvent) -> bool {
    match event.code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => true,
        KeyCode::Char('c') => event.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quits(code: KeyCode, modifiers: KeyModifiers) -> bool {
        is_quit_key(&KeyEvent::new(code, modifiers))
    }

    #[test]
    fn test_quit_keys() {
        assert!(quits(KeyCode::Esc, KeyModifiers::NONE));
        assert!(quits(KeyCode::Char('q'), KeyModifiers::NONE));
        assert!(quits(KeyCode::Char('Q'), KeyModifiers::SHIFT));
        assert!(quits(KeyCode::Char('c'), KeyModifiers::CONTROL));
    }

    #[test]
    fn test_other_keys_ignored() {
        assert!(!quits(KeyCode::Char('a'), KeyModifiers::NONE));
        assert!(!quits(KeyCode::Enter, KeyModifiers::NONE));
        assert!(!quits(KeyCode::Char('c'), KeyModifiers::NONE));
    }
}
