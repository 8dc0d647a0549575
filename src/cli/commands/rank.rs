//! Rank lookup command handler

use crate::domain::GuildRank;

pub fn cmd_rank(missions: i32) -> anyhow::Result<()> {
    if missions < 0 {
        anyhow::bail!("Mission count cannot be negative");
    }

    let rank = GuildRank::for_missions_completed(missions);
    println!("{missions} missions completed -> {rank}");

    let next = GuildRank::THRESHOLDS
        .iter()
        .rev()
        .find(|(threshold, _)| *threshold > missions);

    match next {
        Some((threshold, next_rank)) => {
            println!("  {} more for {next_rank}", threshold - missions);
        }
        None => println!("  Highest rank reached"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_negative_counts() {
        assert!(cmd_rank(-1).is_err());
        assert!(cmd_rank(0).is_ok());
        assert!(cmd_rank(13).is_ok());
    }
}
