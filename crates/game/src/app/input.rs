use engine::KeyCode;

/// The logical movement controls a key can map to. Several physical keys may
/// bind to one intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Intent {
    Forward,
    Backward,
    Left,
    Right,
    Jump,
}

const INTENT_COUNT: usize = 5;

impl Intent {
    const fn index(self) -> usize {
        match self {
            Intent::Forward => 0,
            Intent::Backward => 1,
            Intent::Left => 2,
            Intent::Right => 3,
            Intent::Jump => 4,
        }
    }
}

pub(crate) fn intent_for_key(key: KeyCode) -> Option<Intent> {
    match key {
        KeyCode::ArrowUp | KeyCode::KeyW => Some(Intent::Forward),
        KeyCode::ArrowDown | KeyCode::KeyS => Some(Intent::Backward),
        KeyCode::ArrowLeft | KeyCode::KeyA => Some(Intent::Left),
        KeyCode::ArrowRight | KeyCode::KeyD => Some(Intent::Right),
        KeyCode::Space => Some(Intent::Jump),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct IntentTransition {
    pub(crate) intent: Intent,
    pub(crate) active: bool,
}

/// Tracks which physical keys currently hold each intent. An intent is active
/// while at least one of its bound keys is held, so releasing one alias never
/// clears an intent another alias still holds.
#[derive(Debug, Default)]
pub(crate) struct IntentTracker {
    held: [Vec<KeyCode>; INTENT_COUNT],
}

impl IntentTracker {
    /// Records a key press. Returns a transition only when the intent just
    /// became active; repeats of an already-held key change nothing.
    pub(crate) fn key_down(&mut self, key: KeyCode) -> Option<IntentTransition> {
        let intent = intent_for_key(key)?;
        let held = &mut self.held[intent.index()];
        if held.contains(&key) {
            return None;
        }
        let was_inactive = held.is_empty();
        held.push(key);
        was_inactive.then_some(IntentTransition {
            intent,
            active: true,
        })
    }

    /// Records a key release. Returns a transition only when the last held
    /// key for the intent went up; releasing an unpressed key is a no-op.
    pub(crate) fn key_up(&mut self, key: KeyCode) -> Option<IntentTransition> {
        let intent = intent_for_key(key)?;
        let held = &mut self.held[intent.index()];
        let position = held.iter().position(|h| *h == key)?;
        held.remove(position);
        held.is_empty().then_some(IntentTransition {
            intent,
            active: false,
        })
    }

    #[cfg(test)]
    pub(crate) fn is_active(&self, intent: Intent) -> bool {
        !self.held[intent.index()].is_empty()
    }
}
