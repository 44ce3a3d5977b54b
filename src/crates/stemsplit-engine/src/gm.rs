//! General MIDI name tables used to label output tracks

/// GM Level 1 instrument names, indexed by program number
#[rustfmt::skip]
pub const INSTRUMENT_NAMES: [&str; 128] = [
    // Piano
    "Acoustic Grand Piano", "Bright Acoustic Piano", "Electric Grand Piano", "Honky-tonk Piano",
    "Electric Piano 1", "Electric Piano 2", "Harpsichord", "Clavi",
    // Chromatic Percussion
    "Celesta", "Glockenspiel", "Music Box", "Vibraphone",
    "Marimba", "Xylophone", "Tubular Bells", "Dulcimer",
    // Organ
    "Drawbar Organ", "Percussive Organ", "Rock Organ", "Church Organ",
    "Reed Organ", "Accordion", "Harmonica", "Tango Accordion",
    // Guitar
    "Acoustic Guitar (nylon)", "Acoustic Guitar (steel)", "Electric Guitar (jazz)", "Electric Guitar (clean)",
    "Electric Guitar (muted)", "Overdriven Guitar", "Distortion Guitar", "Guitar Harmonics",
    // Bass
    "Acoustic Bass", "Electric Bass (finger)", "Electric Bass (pick)", "Fretless Bass",
    "Slap Bass 1", "Slap Bass 2", "Synth Bass 1", "Synth Bass 2",
    // Strings
    "Violin", "Viola", "Cello", "Contrabass",
    "Tremolo Strings", "Pizzicato Strings", "Orchestral Harp", "Timpani",
    // Ensemble
    "String Ensemble 1", "String Ensemble 2", "SynthStrings 1", "SynthStrings 2",
    "Choir Aahs", "Voice Oohs", "Synth Voice", "Orchestra Hit",
    // Brass
    "Trumpet", "Trombone", "Tuba", "Muted Trumpet",
    "French Horn", "Brass Section", "SynthBrass 1", "SynthBrass 2",
    // Reed
    "Soprano Sax", "Alto Sax", "Tenor Sax", "Baritone Sax",
    "Oboe", "English Horn", "Bassoon", "Clarinet",
    // Pipe
    "Piccolo", "Flute", "Recorder", "Pan Flute",
    "Blown Bottle", "Shakuhachi", "Whistle", "Ocarina",
    // Synth Lead
    "Lead 1 (square)", "Lead 2 (sawtooth)", "Lead 3 (calliope)", "Lead 4 (chiff)",
    "Lead 5 (charang)", "Lead 6 (voice)", "Lead 7 (fifths)", "Lead 8 (bass + lead)",
    // Synth Pad
    "Pad 1 (new age)", "Pad 2 (warm)", "Pad 3 (polysynth)", "Pad 4 (choir)",
    "Pad 5 (bowed)", "Pad 6 (metallic)", "Pad 7 (halo)", "Pad 8 (sweep)",
    // Synth Effects
    "FX 1 (rain)", "FX 2 (soundtrack)", "FX 3 (crystal)", "FX 4 (atmosphere)",
    "FX 5 (brightness)", "FX 6 (goblins)", "FX 7 (echoes)", "FX 8 (sci-fi)",
    // Ethnic
    "Sitar", "Banjo", "Shamisen", "Koto",
    "Kalimba", "Bag pipe", "Fiddle", "Shanai",
    // Percussive
    "Tinkle Bell", "Agogo", "Steel Drums", "Woodblock",
    "Taiko Drum", "Melodic Tom", "Synth Drum", "Reverse Cymbal",
    // Sound Effects
    "Guitar Fret Noise", "Breath Noise", "Seashore", "Bird Tweet",
    "Telephone Ring", "Helicopter", "Applause", "Gunshot",
];

/// Name of the reserved track holding channel-independent events
pub const GLOBAL_TRACK_NAME: &str = "Global Events";

/// Get the human-readable name for a GM program number
pub fn instrument_name(program: u8) -> &'static str {
    INSTRUMENT_NAMES
        .get(program as usize)
        .copied()
        .unwrap_or("Unknown")
}

/// Drum kit name for a program selected on the percussion channel (GS kit layout).
///
/// Programs are the 0-based values carried in the program-change message, so
/// Room is 8 and Brush is 40 (GS lists them 1-based as 9 and 41). Tables that
/// put Room at 7 and Brush at 39 are off by one against that layout.
pub fn drum_kit_name(program: u8) -> &'static str {
    match program {
        0 => "Standard Drum Kit",
        8 => "Room Drum Kit",
        16 => "Power Drum Kit",
        24 => "Electronic Drum Kit",
        25 => "Analog Drum Kit (TR-808)",
        32 => "Jazz Drum Kit",
        40 => "Brush Kit",
        48 => "Orchestral Drum Kit",
        56 => "SFX Drum Kit",
        _ => "Drum Kit",
    }
}

/// Name for an output track: drum kit on the drum channel, instrument elsewhere
pub fn track_name(program: u8, on_drum_channel: bool) -> &'static str {
    if on_drum_channel {
        drum_kit_name(program)
    } else {
        instrument_name(program)
    }
}
