//! Key state machine
//!
//! Tracks every key that is currently down, detects the screenshot chord
//! edge and routes keys pressed while the mode key is held into commands.
//! Owned by the hook thread; nothing here is shared.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::config::{Action, ShortcutConfig};
use crate::events::Command;
use crate::hotkey::{Decision, HeldKeys, KeyCode, KeyEvent};
use crate::overlay::VisibilityGuard;

/// Outcome of feeding one key event to the machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub decision: Decision,
    pub command: Option<Command>,
}

impl Evaluation {
    fn pass() -> Self {
        Self {
            decision: Decision::Pass,
            command: None,
        }
    }

    fn suppress(command: Option<Command>) -> Self {
        Self {
            decision: Decision::Suppress,
            command,
        }
    }
}

/// Live pressed-key model plus shortcut evaluation
pub struct ModifierStateMachine {
    config: Arc<ShortcutConfig>,
    /// Keys with a down event and no matching up yet
    pressed: HashSet<KeyCode>,
    held: HeldKeys,
}

impl ModifierStateMachine {
    pub fn new(config: Arc<ShortcutConfig>) -> Self {
        Self {
            config,
            pressed: HashSet::with_capacity(16),
            held: HeldKeys::default(),
        }
    }

    pub fn pressed(&self) -> &HashSet<KeyCode> {
        &self.pressed
    }

    pub fn held(&self) -> HeldKeys {
        self.held
    }

    /// Update state for `event` and decide what happens to it
    pub fn handle(&mut self, event: KeyEvent, guard: &dyn VisibilityGuard) -> Evaluation {
        match event {
            KeyEvent::Down(key) => self.key_down(key, guard),
            KeyEvent::Up(key) => {
                self.key_up(key);
                Evaluation::pass()
            }
        }
    }

    fn key_down(&mut self, key: KeyCode, guard: &dyn VisibilityGuard) -> Evaluation {
        let repeat = !self.pressed.insert(key);
        let role_was_held = key.role().map(|role| self.held.role(role));
        self.mark(key, true);

        if !repeat && role_was_held == Some(false) {
            if let Some(eval) = self.screenshot_edge(key, guard) {
                return eval;
            }
        }

        self.mode_action(key, repeat).unwrap_or_else(Evaluation::pass)
    }

    fn key_up(&mut self, key: KeyCode) {
        self.pressed.remove(&key);
        self.mark(key, false);
    }

    /// Set or clear the cached flag attributable to `key`
    fn mark(&mut self, key: KeyCode, down: bool) {
        if let Some(role) = key.role() {
            // Left and right variants share one flag, so a release only
            // clears it once no variant remains pressed.
            let held = down || self.pressed.iter().any(|k| k.role() == Some(role));
            self.held.set_role(role, held);
        }
        if let Some(nav) = key.nav() {
            self.held.set_nav(nav, down);
        }
        if self.config.mode().is_some_and(|mode| mode.modifier() == key) {
            self.held.mode = down;
        }
    }

    fn screenshot_edge(&self, key: KeyCode, guard: &dyn VisibilityGuard) -> Option<Evaluation> {
        let rule = self.config.screenshot();
        if !rule.is_armed() {
            return None;
        }

        let role = key.role()?;
        if !self.held.role(role.counterpart()) {
            return None;
        }

        if guard.is_overlay_visible() {
            debug!(%key, "screenshot chord ignored, overlay visible");
            return None;
        }

        debug!(%key, "screenshot chord completed");
        Some(Evaluation::suppress(Some(Command::Screenshot)))
    }

    fn mode_action(&self, key: KeyCode, repeat: bool) -> Option<Evaluation> {
        let mode = self.config.mode()?;
        if !self.held.mode || key == mode.modifier() {
            return None;
        }

        let action = mode.action_for(key)?;
        trace!(%key, ?action, repeat, "mode key action");

        let command = match action {
            Action::Move(_) => match self.held.movement(mode.move_step()) {
                (0, 0) => None,
                (dx, dy) => Some(Command::Move { dx, dy }),
            },
            // Auto-repeat of a held action key is swallowed without firing again
            _ if repeat => None,
            Action::ToggleVisibility => Some(Command::ToggleVisibility),
            Action::Quit => Some(Command::Quit),
            Action::Consume => None,
        };

        Some(Evaluation::suppress(command))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ModeConfig, ScreenshotRule, TriggerPolicy};
    use crate::hotkey::{codes, ModifierRole};
    use std::collections::HashMap;

    const J: KeyCode = KeyCode(b'J' as u32);
    const Q: KeyCode = KeyCode(b'Q' as u32);
    const X: KeyCode = KeyCode(b'X' as u32);

    fn hidden() -> bool {
        false
    }

    fn shown() -> bool {
        true
    }

    fn full_config() -> Arc<ShortcutConfig> {
        let mut actions = HashMap::new();
        actions.insert(J, Action::ToggleVisibility);
        actions.insert(Q, Action::Quit);
        actions.insert(X, Action::Consume);
        Arc::new(ShortcutConfig::new(
            ScreenshotRule::new(vec![codes::CONTROL, codes::MENU], TriggerPolicy::SecondModifier),
            Some(ModeConfig::new(codes::F2, 10, actions)),
        ))
    }

    fn create_state_machine() -> ModifierStateMachine {
        ModifierStateMachine::new(full_config())
    }

    fn replay(sm: &mut ModifierStateMachine, events: &[KeyEvent]) -> Vec<Evaluation> {
        events.iter().map(|&e| sm.handle(e, &hidden)).collect()
    }

    fn commands(evals: &[Evaluation]) -> Vec<Command> {
        evals.iter().filter_map(|e| e.command).collect()
    }

    #[test]
    fn test_initial_state() {
        let sm = create_state_machine();
        assert!(sm.pressed().is_empty());
        assert_eq!(sm.held(), HeldKeys::default());
    }

    #[test]
    fn test_pressed_set_matches_history() {
        let mut sm = create_state_machine();
        replay(
            &mut sm,
            &[
                KeyEvent::Down(codes::LCONTROL),
                KeyEvent::Down(J),
                KeyEvent::Down(codes::F2),
                KeyEvent::Up(J),
                KeyEvent::Down(codes::UP),
                KeyEvent::Down(codes::UP),
                KeyEvent::Up(codes::LCONTROL),
                KeyEvent::Down(Q),
            ],
        );

        let expected: HashSet<_> = [codes::F2, codes::UP, Q].into_iter().collect();
        assert_eq!(sm.pressed(), &expected);
        assert!(!sm.held().ctrl);
        assert!(sm.held().mode);
        assert!(sm.held().up);
    }

    /// Deterministic generator for event sequences
    struct Lcg(u64);

    impl Lcg {
        fn below(&mut self, n: usize) -> usize {
            self.0 = self
                .0
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            ((self.0 >> 33) % n as u64) as usize
        }
    }

    #[test]
    fn test_pressed_set_tracks_generated_sequences() {
        let pool = [
            codes::CONTROL,
            codes::LCONTROL,
            codes::RCONTROL,
            codes::MENU,
            codes::LMENU,
            codes::RMENU,
            codes::F2,
            codes::UP,
            codes::DOWN,
            codes::LEFT,
            codes::RIGHT,
            codes::SPACE,
            J,
            Q,
            X,
        ];
        let mut rng = Lcg(0x5eed);

        for _ in 0..300 {
            let mut sm = create_state_machine();
            let mut unmatched = HashSet::new();

            for _ in 0..48 {
                let key = pool[rng.below(pool.len())];
                if rng.below(2) == 0 {
                    sm.handle(KeyEvent::Down(key), &hidden);
                    unmatched.insert(key);
                } else {
                    let eval = sm.handle(KeyEvent::Up(key), &hidden);
                    assert_eq!(eval, Evaluation::pass());
                    unmatched.remove(&key);
                }

                assert_eq!(sm.pressed(), &unmatched);

                let any_of = |role: ModifierRole| unmatched.iter().any(|k| k.role() == Some(role));
                let held = sm.held();
                assert_eq!(held.ctrl, any_of(ModifierRole::Ctrl));
                assert_eq!(held.alt, any_of(ModifierRole::Alt));
                assert_eq!(held.mode, unmatched.contains(&codes::F2));
                assert_eq!(held.up, unmatched.contains(&codes::UP));
                assert_eq!(held.down, unmatched.contains(&codes::DOWN));
                assert_eq!(held.left, unmatched.contains(&codes::LEFT));
                assert_eq!(held.right, unmatched.contains(&codes::RIGHT));
            }
        }
    }

    #[test]
    fn test_ctrl_then_alt_fires_once() {
        let mut sm = create_state_machine();
        let evals = replay(
            &mut sm,
            &[KeyEvent::Down(codes::LCONTROL), KeyEvent::Down(codes::LMENU)],
        );

        assert_eq!(evals[0], Evaluation::pass());
        assert_eq!(evals[1], Evaluation::suppress(Some(Command::Screenshot)));
    }

    #[test]
    fn test_alt_then_ctrl_fires_once() {
        let mut sm = create_state_machine();
        let evals = replay(
            &mut sm,
            &[KeyEvent::Down(codes::RMENU), KeyEvent::Down(codes::RCONTROL)],
        );

        assert_eq!(commands(&evals), vec![Command::Screenshot]);
        assert_eq!(evals[1].decision, Decision::Suppress);
    }

    #[test]
    fn test_key_repeat_does_not_refire() {
        let mut sm = create_state_machine();
        let evals = replay(
            &mut sm,
            &[
                KeyEvent::Down(codes::LCONTROL),
                KeyEvent::Down(codes::LMENU),
                KeyEvent::Down(codes::LMENU),
                KeyEvent::Down(codes::LCONTROL),
                KeyEvent::Down(codes::LMENU),
            ],
        );

        assert_eq!(commands(&evals), vec![Command::Screenshot]);
        assert!(evals[2..].iter().all(|e| e.decision == Decision::Pass));
    }

    #[test]
    fn test_second_variant_of_held_role_does_not_refire() {
        let mut sm = create_state_machine();
        let evals = replay(
            &mut sm,
            &[
                KeyEvent::Down(codes::LCONTROL),
                KeyEvent::Down(codes::LMENU),
                KeyEvent::Down(codes::RCONTROL),
            ],
        );

        assert_eq!(commands(&evals), vec![Command::Screenshot]);
    }

    #[test]
    fn test_chord_refires_after_release() {
        let mut sm = create_state_machine();
        let evals = replay(
            &mut sm,
            &[
                KeyEvent::Down(codes::LCONTROL),
                KeyEvent::Down(codes::LMENU),
                KeyEvent::Up(codes::LMENU),
                KeyEvent::Down(codes::LMENU),
            ],
        );

        assert_eq!(commands(&evals), vec![Command::Screenshot, Command::Screenshot]);
    }

    #[test]
    fn test_no_screenshot_while_overlay_visible() {
        let mut sm = create_state_machine();
        let first = sm.handle(KeyEvent::Down(codes::LCONTROL), &shown);
        let second = sm.handle(KeyEvent::Down(codes::LMENU), &shown);

        assert_eq!(first, Evaluation::pass());
        assert_eq!(second, Evaluation::pass());
    }

    #[test]
    fn test_disabled_trigger() {
        let mut sm = ModifierStateMachine::new(Arc::new(ShortcutConfig::default()));
        let evals = replay(
            &mut sm,
            &[KeyEvent::Down(codes::CONTROL), KeyEvent::Down(codes::MENU)],
        );

        assert!(commands(&evals).is_empty());
    }

    #[test]
    fn test_diagonal_move() {
        let mut sm = create_state_machine();
        let evals = replay(
            &mut sm,
            &[
                KeyEvent::Down(codes::F2),
                KeyEvent::Down(codes::UP),
                KeyEvent::Down(codes::RIGHT),
            ],
        );

        assert_eq!(evals[0], Evaluation::pass());
        assert_eq!(
            evals[1],
            Evaluation::suppress(Some(Command::Move { dx: 0, dy: -10 }))
        );
        assert_eq!(
            evals[2],
            Evaluation::suppress(Some(Command::Move { dx: 10, dy: -10 }))
        );
    }

    #[test]
    fn test_move_repeats_while_held() {
        let mut sm = create_state_machine();
        let evals = replay(
            &mut sm,
            &[
                KeyEvent::Down(codes::F2),
                KeyEvent::Down(codes::LEFT),
                KeyEvent::Down(codes::LEFT),
            ],
        );

        assert_eq!(
            commands(&evals),
            vec![Command::Move { dx: -10, dy: 0 }, Command::Move { dx: -10, dy: 0 }]
        );
    }

    #[test]
    fn test_cancelling_arrows_suppress_without_move() {
        let mut sm = create_state_machine();
        let evals = replay(
            &mut sm,
            &[
                KeyEvent::Down(codes::F2),
                KeyEvent::Down(codes::UP),
                KeyEvent::Down(codes::DOWN),
            ],
        );

        assert_eq!(evals[2], Evaluation::suppress(None));
    }

    #[test]
    fn test_arrows_pass_without_mode_key() {
        let mut sm = create_state_machine();
        let eval = sm.handle(KeyEvent::Down(codes::UP), &hidden);
        assert_eq!(eval, Evaluation::pass());
    }

    #[test]
    fn test_toggle_visibility() {
        let mut sm = create_state_machine();
        let evals = replay(&mut sm, &[KeyEvent::Down(codes::F2), KeyEvent::Down(J)]);

        assert_eq!(
            evals[1],
            Evaluation::suppress(Some(Command::ToggleVisibility))
        );
    }

    #[test]
    fn test_action_key_repeat_is_swallowed() {
        let mut sm = create_state_machine();
        let evals = replay(
            &mut sm,
            &[
                KeyEvent::Down(codes::F2),
                KeyEvent::Down(J),
                KeyEvent::Down(J),
                KeyEvent::Down(J),
            ],
        );

        assert_eq!(commands(&evals), vec![Command::ToggleVisibility]);
        assert!(evals[1..].iter().all(|e| e.decision == Decision::Suppress));
    }

    #[test]
    fn test_quit_and_consume() {
        let mut sm = create_state_machine();
        let evals = replay(
            &mut sm,
            &[
                KeyEvent::Down(codes::F2),
                KeyEvent::Down(X),
                KeyEvent::Down(Q),
            ],
        );

        assert_eq!(evals[1], Evaluation::suppress(None));
        assert_eq!(evals[2], Evaluation::suppress(Some(Command::Quit)));
    }

    #[test]
    fn test_unmapped_key_passes_in_mode() {
        let mut sm = create_state_machine();
        let evals = replay(
            &mut sm,
            &[KeyEvent::Down(codes::F2), KeyEvent::Down(codes::SPACE)],
        );

        assert_eq!(evals[1], Evaluation::pass());
    }

    #[test]
    fn test_action_key_passes_after_mode_released() {
        let mut sm = create_state_machine();
        let evals = replay(
            &mut sm,
            &[
                KeyEvent::Down(codes::F2),
                KeyEvent::Up(codes::F2),
                KeyEvent::Down(J),
            ],
        );

        assert!(commands(&evals).is_empty());
        assert_eq!(evals[2], Evaluation::pass());
    }

    #[test]
    fn test_releases_always_pass() {
        let mut sm = create_state_machine();
        let evals = replay(
            &mut sm,
            &[
                KeyEvent::Down(codes::F2),
                KeyEvent::Down(J),
                KeyEvent::Up(J),
                KeyEvent::Up(codes::F2),
                KeyEvent::Up(codes::F2),
                KeyEvent::Up(codes::ESCAPE),
            ],
        );

        assert!(evals[2..].iter().all(|e| *e == Evaluation::pass()));
        assert!(sm.pressed().is_empty());
        assert!(!sm.held().mode);
    }

    #[test]
    fn test_role_held_until_both_sides_released() {
        let mut sm = create_state_machine();
        replay(
            &mut sm,
            &[
                KeyEvent::Down(codes::LCONTROL),
                KeyEvent::Down(codes::RCONTROL),
                KeyEvent::Up(codes::LCONTROL),
            ],
        );
        assert!(sm.held().ctrl);

        sm.handle(KeyEvent::Up(codes::RCONTROL), &hidden);
        assert!(!sm.held().ctrl);
    }

    #[test]
    fn test_inert_mode_config() {
        let config = ShortcutConfig::from_json(
            r#"{"f2_mode": {"modifier": "NOPE", "actions": {"J": "toggle_visibility"}}}"#,
        )
        .unwrap();
        let mut sm = ModifierStateMachine::new(Arc::new(config));
        let evals = replay(
            &mut sm,
            &[
                KeyEvent::Down(codes::F2),
                KeyEvent::Down(J),
                KeyEvent::Down(codes::UP),
            ],
        );

        assert!(evals.iter().all(|e| *e == Evaluation::pass()));
        assert!(!sm.held().mode);
    }
}
