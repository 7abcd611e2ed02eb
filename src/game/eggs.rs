//! Phrase-triggered reactions.
//!
//! Outgoing messages are checked against a fixed trigger table before they
//! are keyed out. Matching is case-insensitive substring search and the
//! first table entry wins, so the order below is load bearing.

use std::time::Duration;

use bitflags::bitflags;

bitflags! {
    /// Overlay effects a reaction asks the console to draw.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Visuals: u8 {
        const GATE_OVERLAY = 1 << 0;
        const RED_TINT = 1 << 1;
        const PARTICLES = 1 << 2;
        const SHAKE = 1 << 3;
        const STATIC_BURST = 1 << 4;
        const FLICKER = 1 << 5;
        const WARM_GLOW = 1 << 6;
        const LIGHTS = 1 << 7;
    }
}

pub struct Egg {
    pub phrase: &'static str,
    pub banner: &'static str,
    /// An answer that appears in the log, as if something replied.
    pub secret: Option<&'static str>,
    pub duration: Duration,
    pub sanity_boost: f32,
    pub force_possess: bool,
    pub clear_corruption: bool,
    pub visuals: Visuals,
}

const TRIGGERS: [Egg; 8] = [
    Egg {
        phrase: "OPEN GATE",
        banner: "THE GATE IS OPENING",
        secret: None,
        duration: Duration::from_secs(20),
        sanity_boost: 0.0,
        force_possess: false,
        clear_corruption: false,
        visuals: Visuals::GATE_OVERLAY
            .union(Visuals::RED_TINT)
            .union(Visuals::PARTICLES),
    },
    Egg {
        phrase: "RUN",
        banner: "RUN",
        secret: None,
        duration: Duration::from_secs(10),
        sanity_boost: 0.0,
        force_possess: false,
        clear_corruption: false,
        visuals: Visuals::SHAKE.union(Visuals::RED_TINT).union(Visuals::FLICKER),
    },
    Egg {
        phrase: "HELLO FROM UPSIDE",
        banner: "SIGNAL RECEIVED FROM THE OTHER SIDE",
        secret: Some("WE CAN HEAR YOU NOW"),
        duration: Duration::from_secs(20),
        sanity_boost: 0.0,
        force_possess: false,
        clear_corruption: false,
        visuals: Visuals::PARTICLES.union(Visuals::FLICKER),
    },
    Egg {
        phrase: "ELEVEN",
        banner: "SHE IS LISTENING",
        secret: None,
        duration: Duration::from_secs(10),
        sanity_boost: 50.0,
        force_possess: false,
        clear_corruption: false,
        visuals: Visuals::WARM_GLOW,
    },
    Egg {
        phrase: "DEMOGORGON",
        banner: "YOU SHOULD NOT HAVE SAID THAT",
        secret: None,
        duration: Duration::from_secs(5),
        sanity_boost: 0.0,
        force_possess: true,
        clear_corruption: false,
        visuals: Visuals::RED_TINT
            .union(Visuals::SHAKE)
            .union(Visuals::STATIC_BURST),
    },
    Egg {
        phrase: "WILL",
        banner: "WILL IS LISTENING",
        secret: Some("RIGHT HERE"),
        duration: Duration::from_secs(10),
        sanity_boost: 0.0,
        force_possess: false,
        clear_corruption: false,
        visuals: Visuals::LIGHTS,
    },
    Egg {
        phrase: "HAWKINS",
        banner: "HAWKINS LAB MONITORING ACTIVE",
        secret: None,
        duration: Duration::from_secs(10),
        sanity_boost: 0.0,
        force_possess: false,
        clear_corruption: false,
        visuals: Visuals::FLICKER,
    },
    Egg {
        phrase: "FRIENDS DONT LIE",
        banner: "FRIENDS DONT LIE",
        secret: None,
        duration: Duration::from_secs(10),
        sanity_boost: 30.0,
        force_possess: false,
        clear_corruption: true,
        visuals: Visuals::WARM_GLOW.union(Visuals::LIGHTS),
    },
];

/// Finds the first trigger contained in the message, if any.
pub fn check(message: &str) -> Option<&'static Egg> {
    let upper = message.trim().to_uppercase();
    TRIGGERS.iter().find(|x| upper.contains(x.phrase))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_substring_and_case() {
        let egg = check("please open gate now").unwrap();
        assert_eq!(egg.phrase, "OPEN GATE");
        assert!(egg.visuals.contains(Visuals::GATE_OVERLAY));

        assert!(check("nothing special").is_none());
    }

    #[test]
    fn test_table_order_wins() {
        // Contains both OPEN GATE and RUN; the table puts OPEN GATE first.
        let egg = check("OPEN GATE AND RUN").unwrap();
        assert_eq!(egg.phrase, "OPEN GATE");
    }

    #[test]
    fn test_demogorgon_forces_possession() {
        let egg = check("DEMOGORGON").unwrap();
        assert!(egg.force_possess);
        assert_eq!(egg.duration, Duration::from_secs(5));
    }

    #[test]
    fn test_restorative_eggs() {
        let eleven = check("TELL ELEVEN").unwrap();
        assert_eq!(eleven.sanity_boost, 50.0);
        assert!(!eleven.clear_corruption);

        let friends = check("friends dont lie").unwrap();
        assert_eq!(friends.sanity_boost, 30.0);
        assert!(friends.clear_corruption);
    }

    #[test]
    fn test_secret_responses() {
        assert_eq!(
            check("HELLO FROM UPSIDE").unwrap().secret,
            Some("WE CAN HEAR YOU NOW")
        );
        assert_eq!(check("WILL").unwrap().secret, Some("RIGHT HERE"));
        assert_eq!(check("HAWKINS").unwrap().secret, None);
    }
}
