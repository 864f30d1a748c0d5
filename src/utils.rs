//! Hashing helpers shared by the unique table and the operator caches.

/// [Szudzik pairing function][szudzik-pairing].
///
/// ```text
/// (a, b) -> if (a<b) then (b^2 + a) else (a^2 + a + b)
/// ```
///
/// Arithmetic wraps, so nested pairings of large ids stay usable as hashes.
///
/// [szudzik-pairing]: http://szudzik.com/ElegantPairing.pdf
pub fn pairing_szudzik(a: u64, b: u64) -> u64 {
    if a < b {
        b.wrapping_mul(b).wrapping_add(a)
    } else {
        a.wrapping_mul(a).wrapping_add(a).wrapping_add(b)
    }
}

/// [Pairing function][pairing] for two `u64` values.
///
/// [pairing]: https://en.wikipedia.org/wiki/Pairing_function
pub fn pairing2(a: u64, b: u64) -> u64 {
    pairing_szudzik(a, b)
}

/// Pairing function for three `u64` values.
pub fn pairing3(a: u64, b: u64, c: u64) -> u64 {
    pairing2(pairing2(a, b), c)
}

/// Pairing function for four `u64` values.
pub fn pairing4(a: u64, b: u64, c: u64, d: u64) -> u64 {
    pairing2(pairing2(a, b), pairing2(c, d))
}

/// Finalizer of MurmurHash3: spreads every input bit over the whole word.
pub fn fmix64(mut k: u64) -> u64 {
    k ^= k >> 33;
    k = k.wrapping_mul(0xff51_afd7_ed55_8ccd);
    k ^= k >> 33;
    k = k.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    k ^= k >> 33;
    k
}

/// Primary hash of a `(level, low, high)` triple for the unique table.
pub fn hash_triple(level: u32, low: u32, high: u32) -> u64 {
    let h = (level as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15)
        ^ (low as u64).wrapping_mul(0xc2b2_ae3d_27d4_eb4f)
        ^ (high as u64).rotate_left(32);
    fmix64(h)
}

/// Probe increment for a triple, independent of [`hash_triple`].
///
/// Always odd: against a power-of-two table every slot is visited exactly
/// once before the probe sequence repeats.
pub fn hash_secondary(level: u32, low: u32, high: u32) -> u64 {
    let h = (high as u64).wrapping_mul(0x1656_67b1_9e37_79f9)
        ^ (level as u64).rotate_left(21)
        ^ (low as u64).wrapping_mul(0x27d4_eb2f_1656_67c5);
    fmix64(h) | 1
}

pub trait MyHash {
    /// Perfect hash function.
    fn hash(&self) -> u64;
}

impl MyHash for u32 {
    fn hash(&self) -> u64 {
        *self as u64
    }
}

impl<A: MyHash, B: MyHash> MyHash for (A, B) {
    fn hash(&self) -> u64 {
        pairing2(self.0.hash(), self.1.hash())
    }
}

impl<A: MyHash, B: MyHash, C: MyHash> MyHash for (A, B, C) {
    fn hash(&self) -> u64 {
        pairing3(self.0.hash(), self.1.hash(), self.2.hash())
    }
}

impl<A: MyHash, B: MyHash, C: MyHash, D: MyHash> MyHash for (A, B, C, D) {
    fn hash(&self) -> u64 {
        pairing4(self.0.hash(), self.1.hash(), self.2.hash(), self.3.hash())
    }
}
