use phf::phf_map;

use crate::elements::ReleaseFlags;

/// The category a keyword belongs to, determining which element it populates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordKind {
    VideoCodec,
    AudioCodec,
    Resolution,
    Source,
    VideoTerm,
    AudioTerm,
    Language,
    Subtitles,
    Release(ReleaseFlags),
    /// Recognised release noise that carries no element (e.g. "RAW").
    Ignored,
}

impl KeywordKind {
    /// Codec, audio and resolution terms. These never occur in a title, so
    /// they are recognised anywhere in free text. Every other kind only
    /// counts once the title has ended.
    pub fn is_technical(self) -> bool {
        matches!(
            self,
            Self::VideoCodec | Self::AudioCodec | Self::AudioTerm | Self::Resolution
        )
    }
}

/// Compile-time keyword lookup table.
/// All keys are UPPERCASE for case-insensitive matching.
pub static KEYWORDS: phf::Map<&'static str, KeywordKind> = phf_map! {
    // Video codecs
    "H264" => KeywordKind::VideoCodec,
    "H.264" => KeywordKind::VideoCodec,
    "X264" => KeywordKind::VideoCodec,
    "H265" => KeywordKind::VideoCodec,
    "H.265" => KeywordKind::VideoCodec,
    "X265" => KeywordKind::VideoCodec,
    "HEVC" => KeywordKind::VideoCodec,
    "HEVC-X265" => KeywordKind::VideoCodec,
    "AVC" => KeywordKind::VideoCodec,
    "AV1" => KeywordKind::VideoCodec,
    "10BIT" => KeywordKind::VideoCodec,
    "10-BIT" => KeywordKind::VideoCodec,
    "HI10P" => KeywordKind::VideoCodec,

    // Audio codecs
    "AAC" => KeywordKind::AudioCodec,
    "AC3" => KeywordKind::AudioCodec,
    "EAC3" => KeywordKind::AudioCodec,
    "E-AC-3" => KeywordKind::AudioCodec,
    "FLAC" => KeywordKind::AudioCodec,
    "MP3" => KeywordKind::AudioCodec,
    "OPUS" => KeywordKind::AudioCodec,
    "DTS" => KeywordKind::AudioCodec,
    "TRUEHD" => KeywordKind::AudioCodec,

    // Audio terms
    "2.0CH" => KeywordKind::AudioTerm,
    "2CH" => KeywordKind::AudioTerm,
    "5.1" => KeywordKind::AudioTerm,
    "5.1CH" => KeywordKind::AudioTerm,
    "DUAL-AUDIO" => KeywordKind::AudioTerm,
    "DUALAUDIO" => KeywordKind::AudioTerm,
    "MULTI-AUDIO" => KeywordKind::AudioTerm,

    // Resolution
    "480P" => KeywordKind::Resolution,
    "540P" => KeywordKind::Resolution,
    "576P" => KeywordKind::Resolution,
    "720P" => KeywordKind::Resolution,
    "1080P" => KeywordKind::Resolution,
    "1080I" => KeywordKind::Resolution,
    "2160P" => KeywordKind::Resolution,
    "4K" => KeywordKind::Resolution,

    // Source
    "BD" => KeywordKind::Source,
    "BDRIP" => KeywordKind::Source,
    "BDREMUX" => KeywordKind::Source,
    "BLURAY" => KeywordKind::Source,
    "BLU-RAY" => KeywordKind::Source,
    "DVD" => KeywordKind::Source,
    "DVDRIP" => KeywordKind::Source,
    "HDTV" => KeywordKind::Source,
    "TVRIP" => KeywordKind::Source,
    "WEB" => KeywordKind::Source,
    "WEBDL" => KeywordKind::Source,
    "WEB-DL" => KeywordKind::Source,
    "WEBRIP" => KeywordKind::Source,
    "WEB-RIP" => KeywordKind::Source,
    "CR" => KeywordKind::Source,
    "AMZN" => KeywordKind::Source,
    "NF" => KeywordKind::Source,

    // Video terms
    "HDR" => KeywordKind::VideoTerm,
    "HDR10" => KeywordKind::VideoTerm,
    "DV" => KeywordKind::VideoTerm,

    // Release info
    "BATCH" => KeywordKind::Release(ReleaseFlags::BATCH),
    "COMPLETE" => KeywordKind::Release(ReleaseFlags::COMPLETE),
    "REMASTER" => KeywordKind::Release(ReleaseFlags::REMASTER),
    "REMASTERED" => KeywordKind::Release(ReleaseFlags::REMASTER),
    "UNCENSORED" => KeywordKind::Release(ReleaseFlags::UNCENSORED),
    "UNCUT" => KeywordKind::Release(ReleaseFlags::UNCUT),
    "DUBBED" => KeywordKind::Release(ReleaseFlags::DUBBED),
    "RAW" => KeywordKind::Ignored,

    // Subtitles
    "MULTI-SUB" => KeywordKind::Subtitles,
    "MULTI-SUBS" => KeywordKind::Subtitles,
    "MULTISUB" => KeywordKind::Subtitles,
    "ENG-SUBS" => KeywordKind::Subtitles,
    "SUBBED" => KeywordKind::Subtitles,

    // Languages
    "ENG" => KeywordKind::Language,
    "ENGLISH" => KeywordKind::Language,
    "JPN" => KeywordKind::Language,
    "JAPANESE" => KeywordKind::Language,
};

/// Look up a keyword (case-insensitive).
pub fn lookup(s: &str) -> Option<KeywordKind> {
    KEYWORDS.get(s.to_uppercase().as_str()).copied()
}
