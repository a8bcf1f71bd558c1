use crate::classifier::{ChannelPartition, ResponseClass};
use crate::models::{Baselines, Command, TrimAmount};

/// Build level commands for every adjustable channel.
///
/// With `reset` set, every baseline channel gets `baseline + trim` regardless
/// of its class; that is how calibrated levels are restored with a zero trim.
/// Otherwise full response channels get the trim, half response channels half
/// of it, and excluded channels are skipped. Every level is settled into
/// [`LevelUnits::MIN`](crate::LevelUnits::MIN)..=[`LevelUnits::MAX`](crate::LevelUnits::MAX).
pub fn apply_trim(
    baselines: &Baselines,
    partition: &ChannelPartition,
    trim: TrimAmount,
    reset: bool,
) -> Vec<Command> {
    tracing::info!("Applying trim {} (reset: {})", trim, reset);

    let mut commands = Vec::with_capacity(baselines.len());

    for (channel, &baseline) in baselines {
        let adjustment = if reset {
            trim
        } else {
            match partition.classify(channel) {
                ResponseClass::FullResponse => trim,
                ResponseClass::HalfResponse => trim.halved(),
                ResponseClass::Excluded => {
                    tracing::trace!("{}: excluded from trim", channel);
                    continue;
                }
            }
        };

        let level = baseline.plus_db(adjustment.db()).settle();

        tracing::info!(
            "{}: initial {}dB, adjustment {}dB, final {}dB",
            channel,
            baseline.offset_db(),
            level.value() - baseline.value(),
            level.offset_db()
        );

        commands.push(Command::new(channel.clone(), level));
    }

    commands
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LevelUnits;

    fn baselines(entries: &[(&str, f64)]) -> Baselines {
        entries
            .iter()
            .map(|(channel, level)| (channel.to_string(), LevelUnits::new(*level)))
            .collect()
    }

    fn wire(commands: &[Command]) -> Vec<String> {
        commands.iter().map(Command::to_wire).collect()
    }

    #[test]
    fn test_full_response_channel() {
        let commands = apply_trim(
            &baselines(&[("SL", 50.0)]),
            &ChannelPartition::default(),
            TrimAmount::from_half_steps(2),
            false,
        );
        assert_eq!(wire(&commands), vec!["SSLEVSL 51"]);
    }

    #[test]
    fn test_half_response_channel() {
        let commands = apply_trim(
            &baselines(&[("TFL", 50.0)]),
            &ChannelPartition::default(),
            TrimAmount::from_half_steps(2),
            false,
        );
        assert_eq!(wire(&commands), vec!["SSLEVTFL 505"]);
    }

    #[test]
    fn test_half_response_rounds_half_up() {
        // 1.5 dB * 0.5 = 0.75 -> 1.0
        let commands = apply_trim(
            &baselines(&[("TFR", 47.0)]),
            &ChannelPartition::default(),
            TrimAmount::from_half_steps(3),
            false,
        );
        assert_eq!(wire(&commands), vec!["SSLEVTFR 48"]);
    }

    #[test]
    fn test_excluded_only_on_reset() {
        let levels = baselines(&[("FL", 50.0), ("SW1", 47.5), ("SR", 48.0)]);
        let partition = ChannelPartition::default();

        let commands = apply_trim(&levels, &partition, TrimAmount::from_half_steps(4), false);
        assert_eq!(wire(&commands), vec!["SSLEVSR 50"]);

        let commands = apply_trim(&levels, &partition, TrimAmount::ZERO, true);
        assert_eq!(
            wire(&commands),
            vec!["SSLEVFL 50", "SSLEVSR 48", "SSLEVSW1 475"]
        );
    }

    #[test]
    fn test_reset_restores_baselines() {
        let levels = baselines(&[("SL", 46.5), ("TFL", 52.0), ("TS", 48.3)]);
        let commands = apply_trim(&levels, &ChannelPartition::default(), TrimAmount::ZERO, true);
        assert_eq!(
            wire(&commands),
            vec!["SSLEVSL 465", "SSLEVTFL 52", "SSLEVTS 485"]
        );
    }

    #[test]
    fn test_levels_stay_in_range() {
        let levels = baselines(&[("SL", 61.0), ("SR", 38.0), ("TFL", 62.0), ("TFR", 30.0)]);
        let partition = ChannelPartition::default();

        for half_steps in 0..=30 {
            for reset in [false, true] {
                let commands =
                    apply_trim(&levels, &partition, TrimAmount::from_half_steps(half_steps), reset);
                for command in &commands {
                    assert!(command.level >= LevelUnits::MIN, "{}", command);
                    assert!(command.level <= LevelUnits::MAX, "{}", command);
                }
            }
        }
    }

    #[test]
    fn test_non_finite_baselines_stay_in_range() {
        let levels = baselines(&[("SL", f64::NAN), ("SR", f64::INFINITY), ("TFL", f64::NEG_INFINITY)]);
        let commands = apply_trim(
            &levels,
            &ChannelPartition::default(),
            TrimAmount::from_half_steps(2),
            false,
        );
        assert_eq!(
            wire(&commands),
            vec!["SSLEVSL 50", "SSLEVSR 62", "SSLEVTFL 38"]
        );
    }

    #[test]
    fn test_no_adjustable_channels() {
        let commands = apply_trim(
            &baselines(&[("FL", 50.0), ("C", 50.0)]),
            &ChannelPartition::default(),
            TrimAmount::from_half_steps(6),
            false,
        );
        assert!(commands.is_empty());
        assert!(apply_trim(&Baselines::new(), &ChannelPartition::default(), TrimAmount::ZERO, true).is_empty());
    }
}
