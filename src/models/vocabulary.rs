// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Closed vocabularies for circle and profile fields.
//!
//! The Japanese labels are both the wire values the frontend sends and the
//! values stored in Firestore, so each enum is the single place a label is
//! spelled out. Validation parses raw form strings through `FromStr`;
//! serialization writes the same label back.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Returned when a string is not a member of a vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{value}' is not a valid {vocabulary}")]
pub struct UnknownLabel {
    pub vocabulary: &'static str,
    pub value: String,
}

macro_rules! vocabulary {
    (
        $(#[$meta:meta])*
        $name:ident ($label:literal) {
            $($variant:ident => $text:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            /// Every member, in display order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownLabel;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownLabel {
                        vocabulary: $label,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

vocabulary! {
    /// Circle genre (single select).
    Genre ("genre") {
        BallSports => "スポーツ（球技）",
        OtherSports => "スポーツ（球技以外）",
        OutdoorTravel => "アウトドア・旅行",
        Culture => "文化・教養",
        Arts => "芸術・芸能",
        Music => "音楽",
        Academic => "学問・研究",
        Hobby => "趣味・娯楽",
        International => "国際交流",
        Volunteer => "ボランティア",
        Events => "イベント",
        AllRound => "オールラウンド",
        Other => "その他",
    }
}

vocabulary! {
    /// Circle feature tag (multi select, at least one required).
    Feature ("feature") {
        ManyEvents => "イベント充実",
        MakingFriends => "友達作り重視",
        BeginnersWelcome => "初心者歓迎",
        Relaxed => "ゆるめ",
        Serious => "真剣",
        Athletic => "体育会系",
        Flat => "フラット",
        Friendly => "和やか",
        Lively => "賑やか",
    }
}

vocabulary! {
    /// How often the circle meets.
    Frequency ("frequency") {
        OnceAWeek => "週１回",
        TwiceAWeek => "週２回",
        ThreeTimesAWeek => "週３回",
        OnceAMonth => "月１回",
        Irregular => "不定期",
    }
}

vocabulary! {
    /// Activity weekday. `Irregular` is the "no fixed day" sentinel.
    Weekday ("activity day") {
        Monday => "月曜日",
        Tuesday => "火曜日",
        Wednesday => "水曜日",
        Thursday => "木曜日",
        Friday => "金曜日",
        Saturday => "土曜日",
        Sunday => "日曜日",
        Irregular => "不定期",
    }
}

vocabulary! {
    /// Member count bucket.
    MemberCount ("member count") {
        UpTo10 => "1-10人",
        UpTo30 => "11-30人",
        UpTo50 => "31-50人",
        UpTo100 => "51-100人",
        Over100 => "100人以上",
    }
}

vocabulary! {
    /// Gender ratio bucket.
    GenderRatio ("gender ratio") {
        MostlyMale => "男性多め",
        MostlyFemale => "女性多め",
        Even => "半々",
    }
}

vocabulary! {
    /// Whether members come from one university or several.
    CircleType ("circle type") {
        InUniversity => "学内サークル",
        InterUniversity => "インカレサークル",
    }
}

impl Default for CircleType {
    fn default() -> Self {
        CircleType::InUniversity
    }
}

vocabulary! {
    /// Academic year shown on the profile.
    Grade ("grade") {
        Undergrad1 => "大学1年",
        Undergrad2 => "大学2年",
        Undergrad3 => "大学3年",
        Undergrad4 => "大学4年",
        Graduate1 => "大学院1年",
        Graduate2 => "大学院2年",
        Other => "その他",
    }
}

vocabulary! {
    Gender ("gender") {
        Male => "男性",
        Female => "女性",
        Other => "その他",
        NoAnswer => "回答しない",
    }
}
