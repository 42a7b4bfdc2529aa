//! # Zodiac Placement
//!
//! Maps an ecliptic longitude onto the twelve 30° tropical signs. Only the
//! sign and the degree within it are derived; there are no houses or aspects.
//!
//! The static reading tables (sign influences, moonrise and per-phase
//! recommendations) live here too so every front end shows the same text.

use crate::phase::phase_name;
use crate::ZodiacPosition;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Classical element of a sign.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Element {
    Fire,
    Earth,
    Air,
    Water,
}

/// The twelve tropical signs in ecliptic order, starting at the March equinox.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZodiacSign {
    Aries,
    Taurus,
    Gemini,
    Cancer,
    Leo,
    Virgo,
    Libra,
    Scorpio,
    Sagittarius,
    Capricorn,
    Aquarius,
    Pisces,
}

/// Sign table indexed by `floor(longitude / 30)`.
pub const SIGNS: [ZodiacSign; 12] = [
    ZodiacSign::Aries,
    ZodiacSign::Taurus,
    ZodiacSign::Gemini,
    ZodiacSign::Cancer,
    ZodiacSign::Leo,
    ZodiacSign::Virgo,
    ZodiacSign::Libra,
    ZodiacSign::Scorpio,
    ZodiacSign::Sagittarius,
    ZodiacSign::Capricorn,
    ZodiacSign::Aquarius,
    ZodiacSign::Pisces,
];

const DEGREES_PER_SIGN: f64 = 30.0;

impl ZodiacSign {
    pub fn name(self) -> &'static str {
        match self {
            ZodiacSign::Aries => "Aries",
            ZodiacSign::Taurus => "Taurus",
            ZodiacSign::Gemini => "Gemini",
            ZodiacSign::Cancer => "Cancer",
            ZodiacSign::Leo => "Leo",
            ZodiacSign::Virgo => "Virgo",
            ZodiacSign::Libra => "Libra",
            ZodiacSign::Scorpio => "Scorpio",
            ZodiacSign::Sagittarius => "Sagittarius",
            ZodiacSign::Capricorn => "Capricorn",
            ZodiacSign::Aquarius => "Aquarius",
            ZodiacSign::Pisces => "Pisces",
        }
    }

    pub fn glyph(self) -> char {
        match self {
            ZodiacSign::Aries => '♈',
            ZodiacSign::Taurus => '♉',
            ZodiacSign::Gemini => '♊',
            ZodiacSign::Cancer => '♋',
            ZodiacSign::Leo => '♌',
            ZodiacSign::Virgo => '♍',
            ZodiacSign::Libra => '♎',
            ZodiacSign::Scorpio => '♏',
            ZodiacSign::Sagittarius => '♐',
            ZodiacSign::Capricorn => '♑',
            ZodiacSign::Aquarius => '♒',
            ZodiacSign::Pisces => '♓',
        }
    }

    pub fn element(self) -> Element {
        // Fire, Earth, Air, Water repeat every four signs from Aries
        match self.index() % 4 {
            0 => Element::Fire,
            1 => Element::Earth,
            2 => Element::Air,
            _ => Element::Water,
        }
    }

    pub fn index(self) -> usize {
        SIGNS.iter().position(|&s| s == self).unwrap_or(0)
    }

    /// Three-line reading for the Moon passing through this sign.
    pub fn influences(self) -> [&'static str; 3] {
        match self {
            ZodiacSign::Aries => [
                "A good time to launch new projects with courage",
                "Fire energy that drives direct action and independence",
                "Ideal for quick decisions and fresh starts",
            ],
            ZodiacSign::Taurus => [
                "Favours financial stability and lasting investments",
                "Earth energy that strengthens patience and determination",
                "A time for sensory pleasures and good food",
            ],
            ZodiacSign::Gemini => [
                "Stimulates communication and intellectual exchange",
                "Air energy that feeds curiosity and learning",
                "Favourable for negotiations and contracts",
            ],
            ZodiacSign::Cancer => [
                "Strengthens intuition and close family bonds",
                "Water energy that amplifies empathy and sensitivity",
                "Ideal for caring for the home and for introspection",
            ],
            ZodiacSign::Leo => [
                "A good time to express creativity and natural charisma",
                "Fire energy that boosts self-confidence and self-expression",
                "Ideal for artistic performances and creative projects",
            ],
            ZodiacSign::Virgo => [
                "Favours careful organisation and detailed analysis",
                "Earth energy that strengthens precision and efficiency",
                "A time for health care and purification",
            ],
            ZodiacSign::Libra => [
                "Stimulates harmony in relationships and the search for balance",
                "Air energy that favours diplomacy and aesthetics",
                "Favourable for mediation and partnerships",
            ],
            ZodiacSign::Scorpio => [
                "Intensifies deep transformation and regeneration",
                "Water energy that reveals mysteries and hidden truths",
                "A time for emotional healing and rituals",
            ],
            ZodiacSign::Sagittarius => [
                "Encourages philosophical exploration and distant travel",
                "Fire energy that inspires optimism and the search for meaning",
                "Ideal for teaching and spiritual growth",
            ],
            ZodiacSign::Capricorn => [
                "Strengthens professional ambition and structure",
                "Earth energy that favours perseverance and success",
                "A time for long-term commitments and responsibilities",
            ],
            ZodiacSign::Aquarius => [
                "Stimulates technological innovation and revolutionary ideas",
                "Air energy that favours individuality and humanitarianism",
                "Favourable for community and alternative projects",
            ],
            ZodiacSign::Pisces => [
                "Amplifies creative imagination and universal compassion",
                "Water energy that strengthens intuition and spirituality",
                "Ideal for meditation and artistic expression",
            ],
        }
    }
}

/// Signs sharing `sign`'s element, in table order (including `sign` itself).
pub fn influenced_signs(sign: ZodiacSign) -> Vec<ZodiacSign> {
    let element = sign.element();
    SIGNS
        .iter()
        .copied()
        .filter(|s| s.element() == element)
        .collect()
}

/// General advice for the current lunar phase.
///
/// Three lines common to every phase (the first names the moonrise time when
/// one is known), followed by the phase's own three suggestions.
pub fn recommendations(phase_index: u8, rise: Option<DateTime<Utc>>) -> Vec<String> {
    let moonrise = match rise {
        Some(time) => format!("Meditate at moonrise ({}) to channel lunar energy", time.format("%H:%M UTC")),
        None => "Meditate at moonrise to channel lunar energy".to_string(),
    };

    let mut lines = vec![
        moonrise,
        "Purification and protection rituals are favoured".to_string(),
        "Avoid impulsive decisions, favour deep reflection".to_string(),
    ];
    lines.extend(phase_name(phase_index).advice.iter().map(|a| a.to_string()));
    lines
}

/// Sign and degree-within-sign for an ecliptic longitude.
///
/// Total over all finite inputs: the longitude is wrapped into [0, 360) first.
/// The degree is rounded to one decimal; a value that would round up to 30.0
/// is held at 29.9 so it stays inside its sign.
pub fn resolve(ecliptic_longitude: f64) -> ZodiacPosition {
    let longitude = crate::ephemeris::meeus::normalize_degrees(ecliptic_longitude);
    let index = ((longitude / DEGREES_PER_SIGN).floor() as usize).min(SIGNS.len() - 1);
    let within = longitude % DEGREES_PER_SIGN;
    let rounded = (within * 10.0).round() / 10.0;

    ZodiacPosition {
        sign: SIGNS[index],
        degrees_in_sign: if rounded >= DEGREES_PER_SIGN {
            DEGREES_PER_SIGN - 0.1
        } else {
            rounded
        },
    }
}
