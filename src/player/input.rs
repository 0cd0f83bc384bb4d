//! Keyboard and remote-control input for the player
//!
//! The key table is fixed. The mapper only answers while the player is
//! mounted and stays silent while the channel overlay owns the arrow keys.

use tracing::debug;

use super::transport::{TransportCommand, SEEK_STEP, VOLUME_STEP};

/// Keys the player reacts to, independent of the windowing toolkit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerKey {
    Space,
    K,
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    M,
    F,
    P,
    C,
    PageUp,
    PageDown,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputAction {
    Transport(TransportCommand),
    NextChannel,
    PreviousChannel,
    ShowOverlay,
}

/// Fixed key table
pub fn action_for(key: PlayerKey) -> InputAction {
    use InputAction::Transport;
    match key {
        PlayerKey::Space | PlayerKey::K => Transport(TransportCommand::TogglePlay),
        PlayerKey::ArrowLeft => Transport(TransportCommand::SeekBy(-SEEK_STEP)),
        PlayerKey::ArrowRight => Transport(TransportCommand::SeekBy(SEEK_STEP)),
        PlayerKey::ArrowUp => Transport(TransportCommand::AdjustVolume(VOLUME_STEP)),
        PlayerKey::ArrowDown => Transport(TransportCommand::AdjustVolume(-VOLUME_STEP)),
        PlayerKey::M => Transport(TransportCommand::ToggleMute),
        PlayerKey::F => Transport(TransportCommand::ToggleFullscreen),
        PlayerKey::P => Transport(TransportCommand::TogglePictureInPicture),
        PlayerKey::PageUp => InputAction::NextChannel,
        PlayerKey::PageDown => InputAction::PreviousChannel,
        PlayerKey::C => InputAction::ShowOverlay,
    }
}

#[derive(Debug, Default)]
pub struct InputMapper {
    mounted: bool,
    overlay_active: bool,
}

impl InputMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mount(&mut self) {
        if !self.mounted {
            debug!("Player input attached");
        }
        self.mounted = true;
    }

    pub fn unmount(&mut self) {
        if self.mounted {
            debug!("Player input detached");
        }
        self.mounted = false;
        self.overlay_active = false;
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn set_overlay_active(&mut self, active: bool) {
        self.overlay_active = active;
    }

    pub fn overlay_active(&self) -> bool {
        self.overlay_active
    }

    pub fn map(&self, key: PlayerKey) -> Option<InputAction> {
        if !self.mounted || self.overlay_active {
            return None;
        }
        Some(action_for(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_table() {
        assert_eq!(action_for(PlayerKey::Space), InputAction::Transport(TransportCommand::TogglePlay));
        assert_eq!(action_for(PlayerKey::K), InputAction::Transport(TransportCommand::TogglePlay));
        assert_eq!(action_for(PlayerKey::ArrowLeft), InputAction::Transport(TransportCommand::SeekBy(-5.0)));
        assert_eq!(action_for(PlayerKey::ArrowRight), InputAction::Transport(TransportCommand::SeekBy(5.0)));
        assert_eq!(action_for(PlayerKey::ArrowUp), InputAction::Transport(TransportCommand::AdjustVolume(0.05)));
        assert_eq!(action_for(PlayerKey::M), InputAction::Transport(TransportCommand::ToggleMute));
        assert_eq!(action_for(PlayerKey::F), InputAction::Transport(TransportCommand::ToggleFullscreen));
        assert_eq!(action_for(PlayerKey::P), InputAction::Transport(TransportCommand::TogglePictureInPicture));
        assert_eq!(action_for(PlayerKey::PageUp), InputAction::NextChannel);
        assert_eq!(action_for(PlayerKey::C), InputAction::ShowOverlay);
    }

    #[test]
    fn test_unmounted_mapper_is_silent() {
        let mut mapper = InputMapper::new();
        assert_eq!(mapper.map(PlayerKey::Space), None);

        mapper.mount();
        assert!(mapper.map(PlayerKey::Space).is_some());

        mapper.unmount();
        assert_eq!(mapper.map(PlayerKey::Space), None);
    }

    #[test]
    fn test_overlay_suppresses_all_keys() {
        let mut mapper = InputMapper::new();
        mapper.mount();
        mapper.set_overlay_active(true);
        for key in [PlayerKey::ArrowUp, PlayerKey::ArrowDown, PlayerKey::Space, PlayerKey::C] {
            assert_eq!(mapper.map(key), None);
        }
        mapper.set_overlay_active(false);
        assert_eq!(mapper.map(PlayerKey::ArrowDown), Some(InputAction::Transport(TransportCommand::AdjustVolume(-0.05))));
    }
}
