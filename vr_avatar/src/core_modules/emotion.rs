// THEORY:
// The `emotion` module is the Expression Model. It owns the one piece of pure data
// that decides what the avatar looks like: a lookup table with exactly one
// `FaceParams` per `EmotionId`, laid out contiguously in `EmotionId` order.
//
// Key architectural principles:
// 1.  **Immutable Table**: `FACE_TABLE` is a `static` and is never mutated. Every
//     caller borrows `&'static FaceParams`, so looking up an expression is free.
// 2.  **Graceful Degradation**: Emotion codes arrive from classifiers and remote
//     control as raw integers and labels. Anything out of range resolves to the
//     Neutral face and the name "UNKNOWN" rather than an error; a bad code from the
//     outside world must never take the renderer down.
// 3.  **Scale-Free Geometry**: The parameters are offsets and tweaks. The compositor
//     derives every base size from the face radius, so the same table renders a
//     full-screen face or a small tracked one.
// 4.  **Classifier Vocabulary**: Upstream detectors speak a wider vocabulary
//     (`DetectedEmotion`) than the avatar can show. `DetectedEmotion::to_avatar`
//     folds that vocabulary onto the six faces.

use crate::core_modules::pixel::pixel::Rgb565;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The expressions the avatar can display, in cycling order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum EmotionId {
    #[default]
    Neutral = 0,
    Happy,
    Sad,
    Angry,
    Confused,
    Surprised,
}

impl EmotionId {
    pub const COUNT: usize = 6;

    pub const ALL: [EmotionId; EmotionId::COUNT] = [
        EmotionId::Neutral,
        EmotionId::Happy,
        EmotionId::Sad,
        EmotionId::Angry,
        EmotionId::Confused,
        EmotionId::Surprised,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// The following emotion in cyclic order, wrapping back to Neutral.
    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::COUNT]
    }

    pub fn name(self) -> &'static str {
        EMOTION_NAMES[self.index()]
    }

    pub fn params(self) -> &'static FaceParams {
        &FACE_TABLE[self.index()]
    }
}

impl fmt::Display for EmotionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EmotionId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|e| e.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown emotion '{s}'"))
    }
}

/// Looks up a raw emotion code. Out-of-range codes get the Neutral face.
pub fn get_params(code: usize) -> &'static FaceParams {
    EmotionId::from_index(code)
        .unwrap_or(EmotionId::Neutral)
        .params()
}

/// Name of a raw emotion code, or "UNKNOWN" when it is out of range.
pub fn name_of(code: usize) -> &'static str {
    EmotionId::from_index(code).map_or("UNKNOWN", EmotionId::name)
}

/// The full geometric and color description of one expression.
///
/// Offsets are in pixels. Positive `eye_offset_y` and `eyebrow_offset_y` move
/// features up; positive `mouth_offset_y` moves the mouth down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceParams {
    pub bg_color: Rgb565,
    pub face_color: Rgb565,
    pub eye_color: Rgb565,
    pub eyebrow_color: Rgb565,
    pub mouth_color: Rgb565,
    /// Extra horizontal spread of the eyes, added on each side.
    pub eye_offset_x: i16,
    pub eye_offset_y: i16,
    /// Subtracted from the eye's vertical radius. Negative widens the eyes.
    pub eye_squint: i16,
    /// Gap between the top of the eyes and the eyebrows.
    pub eyebrow_offset_y: i16,
    /// Rise of the eyebrow's outer end relative to its center. Mirrored per side.
    pub eyebrow_angle: i16,
    pub mouth_offset_y: i16,
    /// Nominal mouth width of the expression. The compositor draws every mouth at
    /// half the face radius regardless.
    pub mouth_width: i16,
    /// Thickness of the mouth stroke.
    pub mouth_height: i16,
    /// Corner displacement of the mouth parabola: negative smiles, positive frowns.
    pub mouth_curve: i16,
}

static EMOTION_NAMES: [&str; EmotionId::COUNT] =
    ["NEUTRAL", "HAPPY", "SAD", "ANGRY", "CONFUSED", "SURPRISED"];

/// One entry per `EmotionId`, indexed by its discriminant.
pub static FACE_TABLE: [FaceParams; EmotionId::COUNT] = [
    // Neutral: yellow face, flat features.
    FaceParams {
        bg_color: Rgb565::BLACK,
        face_color: Rgb565::YELLOW,
        eye_color: Rgb565::BLACK,
        eyebrow_color: Rgb565::BLACK,
        mouth_color: Rgb565::BLACK,
        eye_offset_x: 0,
        eye_offset_y: 0,
        eye_squint: 0,
        eyebrow_offset_y: 10,
        eyebrow_angle: 0,
        mouth_offset_y: 30,
        mouth_width: 50,
        mouth_height: 5,
        mouth_curve: 0,
    },
    // Happy: raised, slightly arched brows and a wide open smile.
    FaceParams {
        bg_color: Rgb565::BLACK,
        face_color: Rgb565::YELLOW,
        eye_color: Rgb565::BLACK,
        eyebrow_color: Rgb565::BLACK,
        mouth_color: Rgb565::BLACK,
        eye_offset_x: 0,
        eye_offset_y: -5,
        eye_squint: 0,
        eyebrow_offset_y: 15,
        eyebrow_angle: 10,
        mouth_offset_y: 20,
        mouth_width: 60,
        mouth_height: 10,
        mouth_curve: -20,
    },
    // Sad: blue face, white features, drooping brows and a frown.
    FaceParams {
        bg_color: Rgb565::BLACK,
        face_color: Rgb565::BLUE,
        eye_color: Rgb565::WHITE,
        eyebrow_color: Rgb565::WHITE,
        mouth_color: Rgb565::WHITE,
        eye_offset_x: 0,
        eye_offset_y: 10,
        eye_squint: 2,
        eyebrow_offset_y: -5,
        eyebrow_angle: -20,
        mouth_offset_y: 40,
        mouth_width: 40,
        mouth_height: 5,
        mouth_curve: 15,
    },
    // Angry: red face, squinting eyes, brows slanted sharply inward.
    FaceParams {
        bg_color: Rgb565::BLACK,
        face_color: Rgb565::RED,
        eye_color: Rgb565::BLACK,
        eyebrow_color: Rgb565::BLACK,
        mouth_color: Rgb565::BLACK,
        eye_offset_x: 0,
        eye_offset_y: 0,
        eye_squint: 5,
        eyebrow_offset_y: 5,
        eyebrow_angle: 25,
        mouth_offset_y: 30,
        mouth_width: 50,
        mouth_height: 5,
        mouth_curve: 10,
    },
    // Confused: asymmetric slant and a slightly crooked mouth.
    FaceParams {
        bg_color: Rgb565::BLACK,
        face_color: Rgb565::YELLOW,
        eye_color: Rgb565::BLACK,
        eyebrow_color: Rgb565::BLACK,
        mouth_color: Rgb565::BLACK,
        eye_offset_x: 0,
        eye_offset_y: 0,
        eye_squint: 0,
        eyebrow_offset_y: 10,
        eyebrow_angle: -15,
        mouth_offset_y: 20,
        mouth_width: 40,
        mouth_height: 5,
        mouth_curve: 5,
    },
    // Surprised: wide eyes, high flat brows, tall open mouth.
    FaceParams {
        bg_color: Rgb565::BLACK,
        face_color: Rgb565::YELLOW,
        eye_color: Rgb565::BLACK,
        eyebrow_color: Rgb565::BLACK,
        mouth_color: Rgb565::BLACK,
        eye_offset_x: 0,
        eye_offset_y: 0,
        eye_squint: -5,
        eyebrow_offset_y: 15,
        eyebrow_angle: 0,
        mouth_offset_y: 30,
        mouth_width: 30,
        mouth_height: 30,
        mouth_curve: 0,
    },
];

/// The vocabulary of an upstream facial-expression classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DetectedEmotion {
    Happy,
    Sad,
    Angry,
    Neutral,
    Surprised,
    Fearful,
    Disgusted,
    /// The classifier ran but recognised no expression.
    #[default]
    None,
    Unknown,
    Error,
}

impl DetectedEmotion {
    /// Parses a classifier label. Unrecognised labels mean "no expression".
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "happy" => DetectedEmotion::Happy,
            "sad" => DetectedEmotion::Sad,
            "angry" => DetectedEmotion::Angry,
            "neutral" => DetectedEmotion::Neutral,
            "surprise" | "surprised" => DetectedEmotion::Surprised,
            "fear" | "fearful" => DetectedEmotion::Fearful,
            "disgust" | "disgusted" => DetectedEmotion::Disgusted,
            _ => DetectedEmotion::None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DetectedEmotion::Happy => "happy",
            DetectedEmotion::Sad => "sad",
            DetectedEmotion::Angry => "angry",
            DetectedEmotion::Neutral => "neutral",
            DetectedEmotion::Surprised => "surprise",
            DetectedEmotion::Fearful => "fear",
            DetectedEmotion::Disgusted => "disgust",
            DetectedEmotion::None => "none",
            DetectedEmotion::Unknown => "unknown",
            DetectedEmotion::Error => "error",
        }
    }

    /// Folds the classifier vocabulary onto the faces the avatar can draw.
    pub fn to_avatar(self) -> EmotionId {
        match self {
            DetectedEmotion::Happy => EmotionId::Happy,
            DetectedEmotion::Sad | DetectedEmotion::Fearful => EmotionId::Sad,
            DetectedEmotion::Angry | DetectedEmotion::Disgusted => EmotionId::Angry,
            DetectedEmotion::Surprised => EmotionId::Surprised,
            DetectedEmotion::Neutral
            | DetectedEmotion::None
            | DetectedEmotion::Unknown
            | DetectedEmotion::Error => EmotionId::Neutral,
        }
    }

    /// Whether the classifier actually saw an expression.
    pub fn is_expression(self) -> bool {
        !matches!(
            self,
            DetectedEmotion::None | DetectedEmotion::Unknown | DetectedEmotion::Error
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_indexed_by_emotion() {
        for emotion in EmotionId::ALL {
            assert_eq!(get_params(emotion.index()), emotion.params());
            assert!(std::ptr::eq(get_params(emotion.index()), &FACE_TABLE[emotion.index()]));
        }
        assert_eq!(EmotionId::Sad.params().face_color, Rgb565::BLUE);
        assert_eq!(EmotionId::Angry.params().face_color, Rgb565::RED);
    }

    #[test]
    fn out_of_range_codes_fall_back_to_neutral() {
        let neutral = EmotionId::Neutral.params();
        for code in [EmotionId::COUNT, EmotionId::COUNT + 1, 255, usize::MAX] {
            assert_eq!(get_params(code), neutral);
            assert_eq!(name_of(code), "UNKNOWN");
        }
        assert_eq!(name_of(3), "ANGRY");
    }

    #[test]
    fn next_cycles_back_after_count_steps() {
        for start in EmotionId::ALL {
            let mut e = start;
            for _ in 0..EmotionId::COUNT {
                e = e.next();
            }
            assert_eq!(e, start);
        }
        assert_eq!(EmotionId::Surprised.next(), EmotionId::Neutral);
        assert_eq!(EmotionId::Neutral.next(), EmotionId::Happy);
    }

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("happy".parse::<EmotionId>(), Ok(EmotionId::Happy));
        assert_eq!(" SURPRISED ".parse::<EmotionId>(), Ok(EmotionId::Surprised));
        assert!("bored".parse::<EmotionId>().is_err());
    }

    #[test]
    fn smile_and_frown_signs() {
        assert!(EmotionId::Happy.params().mouth_curve < 0);
        assert!(EmotionId::Sad.params().mouth_curve > 0);
        assert!(EmotionId::Angry.params().mouth_curve > 0);
        assert_eq!(EmotionId::Neutral.params().mouth_curve, 0);
    }

    #[test]
    fn classifier_labels_map_onto_avatar_faces() {
        assert_eq!(DetectedEmotion::from_label("happy").to_avatar(), EmotionId::Happy);
        assert_eq!(DetectedEmotion::from_label("fear").to_avatar(), EmotionId::Sad);
        assert_eq!(DetectedEmotion::from_label("disgust").to_avatar(), EmotionId::Angry);
        assert_eq!(DetectedEmotion::from_label("surprise").to_avatar(), EmotionId::Surprised);
        assert_eq!(DetectedEmotion::from_label("???"), DetectedEmotion::None);
        assert_eq!(DetectedEmotion::Error.to_avatar(), EmotionId::Neutral);
        assert!(!DetectedEmotion::Unknown.is_expression());
        assert_eq!(DetectedEmotion::from_label(DetectedEmotion::Fearful.label()), DetectedEmotion::Fearful);
    }
}
