/// Something the window asks the render session to do.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputAction {
    MoveForward(f32),
    MoveRight(f32),
    MoveUp(f32),
    Quit,
}

pub const VK_ESCAPE: u8 = 0x1B;

/// Maps a key-down virtual key code to an action (AZERTY layout).
pub fn action_for_key(virtual_key: u8) -> Option<InputAction> {
    match virtual_key {
        b'Z' => Some(InputAction::MoveForward(1.0)),
        b'S' => Some(InputAction::MoveForward(-1.0)),
        b'D' => Some(InputAction::MoveRight(1.0)),
        b'Q' => Some(InputAction::MoveRight(-1.0)),
        b'A' => Some(InputAction::MoveUp(1.0)),
        b'E' => Some(InputAction::MoveUp(-1.0)),
        VK_ESCAPE => Some(InputAction::Quit),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn azerty_movement_keys() {
        assert_eq!(action_for_key(b'Z'), Some(InputAction::MoveForward(1.0)));
        assert_eq!(action_for_key(b'S'), Some(InputAction::MoveForward(-1.0)));
        assert_eq!(action_for_key(b'D'), Some(InputAction::MoveRight(1.0)));
        assert_eq!(action_for_key(b'Q'), Some(InputAction::MoveRight(-1.0)));
        assert_eq!(action_for_key(b'A'), Some(InputAction::MoveUp(1.0)));
        assert_eq!(action_for_key(b'E'), Some(InputAction::MoveUp(-1.0)));
    }

    #[test]
    fn escape_quits_and_other_keys_are_ignored() {
        assert_eq!(action_for_key(VK_ESCAPE), Some(InputAction::Quit));
        assert_eq!(action_for_key(b'W'), None);
        assert_eq!(action_for_key(b' '), None);
    }
}
