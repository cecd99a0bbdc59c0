//! Bridging `touchsense_config` types onto engine types.

use crate::channel::{Channel, Direction, SampleType};

impl From<touchsense_config::DirectionCfg> for Direction {
    fn from(c: touchsense_config::DirectionCfg) -> Self {
        match c {
            touchsense_config::DirectionCfg::Negative => Self::Negative,
            touchsense_config::DirectionCfg::Positive => Self::Positive,
        }
    }
}

impl From<touchsense_config::SampleTypeCfg> for SampleType {
    fn from(c: touchsense_config::SampleTypeCfg) -> Self {
        match c {
            touchsense_config::SampleTypeCfg::Normal => Self::Normal,
            touchsense_config::SampleTypeCfg::Inverted => Self::Inverted,
            touchsense_config::SampleTypeCfg::Differential => Self::Differential,
        }
    }
}

impl Channel {
    /// Overlay a config block onto this channel's tuning fields. Runtime
    /// state is untouched.
    pub fn apply_cfg(&mut self, cfg: &touchsense_config::ChannelCfg) {
        self.pin = cfg.pin;
        self.direction = cfg.direction.into();
        self.sample_type = cfg.sample_type.into();

        self.released_to_approached_threshold = cfg.released_to_approached_threshold;
        self.approached_to_released_threshold = cfg.approached_to_released_threshold;
        self.approached_to_pressed_threshold = cfg.approached_to_pressed_threshold;
        self.pressed_to_approached_threshold = cfg.pressed_to_approached_threshold;

        self.released_to_approached_ms = cfg.released_to_approached_ms;
        self.approached_to_released_ms = cfg.approached_to_released_ms;
        self.approached_to_pressed_ms = cfg.approached_to_pressed_ms;
        self.pressed_to_approached_ms = cfg.pressed_to_approached_ms;

        self.pre_calibration_ms = cfg.pre_calibration_ms;
        self.calibration_ms = cfg.calibration_ms;
        self.approached_timeout_ms = cfg.approached_timeout_ms;
        self.pressed_timeout_ms = cfg.pressed_timeout_ms;

        self.filter_window = cfg.filter_window;

        self.force_calibration_when_releasing_from_approached =
            cfg.force_calibration_when_releasing_from_approached.0;
        self.force_calibration_when_approaching_from_released =
            cfg.force_calibration_when_approaching_from_released.0;
        self.force_calibration_when_approaching_from_pressed =
            cfg.force_calibration_when_approaching_from_pressed.0;
        self.force_calibration_when_pressing = cfg.force_calibration_when_pressing.0;

        self.suppress_update_if_any_approached = cfg.suppress_update_if_any_approached;
        self.suppress_update_if_any_pressed = cfg.suppress_update_if_any_pressed;
        self.enable_slewrate_limiter = cfg.enable_slewrate_limiter;
        self.enable_state_machine = cfg.enable_state_machine;
        self.enable_noise_power_measurement = cfg.enable_noise_power_measurement;
        self.disabled = cfg.disabled;

        self.set_offset_manually = cfg.set_offset_manually;
        self.offset_value = cfg.offset_value;
        self.reference_value = cfg.reference_value;
        self.scale_factor = cfg.scale_factor;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_touches_tuning_but_not_runtime_state() {
        let cfg = touchsense_config::Config::from_toml_str(
            r#"
            [engine]
            channels = 2

            [[channel]]
            index = 0
            direction = "negative"
            sample_type = "normal"
            released_to_approached_threshold = 5.5
            filter_window = 8
            force_calibration_when_pressing = [1]
            "#,
        )
        .unwrap();

        let mut ch = Channel::default();
        ch.avg = 123.0;
        ch.apply_cfg(&cfg.channel[0]);

        assert_eq!(ch.direction, Direction::Negative);
        assert_eq!(ch.sample_type, SampleType::Normal);
        assert_eq!(ch.released_to_approached_threshold, 5.5);
        assert_eq!(ch.filter_window, 8);
        assert_eq!(ch.force_calibration_when_pressing, 1 << 1);
        assert_eq!(ch.avg, 123.0);
    }
}
