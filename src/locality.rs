use rand::Rng;

/// Probability that the next reference stays within one page of the current one.
pub const LOCAL_PROBABILITY: f64 = 0.7;

/// Produce the page a process references next, given the page it referenced last.
///
/// Seven times out of ten the reference moves by -1, 0 or +1 page, wrapping around the ends of
/// the address space. Otherwise it jumps to a page at least two away; processes too small to
/// have such a page stay where they are.
///
/// # Arguments
///
/// * `rng` - the run's random source.
/// * `current` - last referenced page, in `[0, size)`.
/// * `size` - number of pages the process owns.
///
pub fn next_page<R: Rng>(rng: &mut R, current: usize, size: usize) -> usize {
    if size == 0 {
        return 0;
    }
    if rng.gen_bool(LOCAL_PROBABILITY) {
        let delta: isize = rng.gen_range(-1..=1);
        (current as isize + delta).rem_euclid(size as isize) as usize
    } else {
        let far: Vec<usize> = (0..size).filter(|j| j.abs_diff(current) >= 2).collect();
        match far.len() {
            0 => current,
            n => far[rng.gen_range(0..n)],
        }
    }
}
