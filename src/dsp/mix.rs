//! Dry/wet blending.

/*
Dry/Wet Mixing
==============

Every effect ends the same way: the unprocessed (dry) block and the
processed (wet) block are crossfaded by the effect's mix amount.

  mix = 0.0  →  dry only
  mix = 0.3  →  70% dry, 30% wet ("30% wet")
  mix = 1.0  →  wet only

The Math
--------

    output = dry × (1 - mix) + wet × mix

The weights sum to 1.0, so two full-scale inputs never sum past full scale.
This is a linear crossfade: at mix = 0.5 two uncorrelated signals sound a
little quieter than either alone. For effect sends that dip is masked by the
effect itself, and the linear law is what automation curves expect.

Exactness at the Ends
---------------------

At mix = 1.0 the wet buffer is returned untouched (no multiply at all), and
at mix = 0.0 the wet term is multiplied by exactly zero. Consumers that
compare against the dry or wet signal get bit-exact results at both ends.
*/

/// Blend one dry and one wet sample.
///
/// output = (dry × (1-mix)) + (wet × mix)
#[inline]
pub fn blend_dry_wet(dry: f32, wet: f32, mix: f32) -> f32 {
    dry * (1.0 - mix) + wet * mix
}

/// Apply dry/wet mixing to a buffer, blending original (dry) with processed (wet).
///
/// Modifies `wet` in-place, using `dry` as the unprocessed reference.
#[inline]
pub fn apply_dry_wet(dry: &[f32], wet: &mut [f32], mix: f32) {
    debug_assert_eq!(dry.len(), wet.len());

    if mix >= 1.0 {
        return;
    }

    for (wet_sample, &dry_sample) in wet.iter_mut().zip(dry.iter()) {
        *wet_sample = blend_dry_wet(dry_sample, *wet_sample, mix);
    }
}

/// Linear crossfade position for sample `index` of a fade lasting `length`
/// samples: 0.0 at the start, 1.0 once the fade is complete.
#[inline]
pub fn fade_gain(index: usize, length: usize) -> f32 {
    if length == 0 || index >= length {
        1.0
    } else {
        index as f32 / length as f32
    }
}
