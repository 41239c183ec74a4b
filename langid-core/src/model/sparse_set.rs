/// A sparse counting set over a bounded integer universe.
///
/// Uses the sparse-set representation of Briggs & Torczon: a dense
/// array of touched keys in insertion order, a parallel array of
/// occurrence counts, and an inverse index from key to dense position.
/// A key is present iff `sparse[key] < members && dense[sparse[key]]
/// == key`, which lets `clear` reset `members` alone in O(1); stale
/// inverse entries fail the guard and are never observed.
///
/// ## Responsibilities
/// - Accumulate per-key counts for one classification round
/// - Reset between rounds without reallocating or zeroing
///
/// # Invariants
/// - `dense[..members]` holds distinct keys in insertion order
/// - `counts[i]` is the accumulated count for `dense[i]`
/// - Capacity is fixed at construction; keys must be below it
pub struct SparseSet {
	members: usize,
	sparse: Box<[u32]>,
	dense: Box<[u32]>,
	counts: Box<[u32]>,
}

impl SparseSet {
	/// Creates an empty set over the universe `0..capacity`.
	///
	/// Allocation happens here and never again; all later operations
	/// reuse the same buffers.
	pub fn new(capacity: usize) -> Self {
		Self {
			members: 0,
			sparse: vec![0; capacity].into_boxed_slice(),
			dense: vec![0; capacity].into_boxed_slice(),
			counts: vec![0; capacity].into_boxed_slice(),
		}
	}

	/// Returns the fixed universe size.
	pub fn capacity(&self) -> usize {
		self.sparse.len()
	}

	/// Returns the number of distinct keys currently present.
	pub fn len(&self) -> usize {
		self.members
	}

	/// Empties the set in O(1).
	///
	/// Only the member counter is reset; the backing arrays keep their
	/// contents, which the presence guard makes unobservable.
	pub fn clear(&mut self) {
		self.members = 0;
	}

	/// Adds `val` to the count of `key`, inserting it if absent.
	///
	/// # Notes
	/// - `key` must be below the capacity; this is the caller's
	///   contract and is only debug-asserted.
	/// - Adding 0 to an absent key still inserts it with count 0.
	pub fn add(&mut self, key: u32, val: u32) {
		debug_assert!((key as usize) < self.capacity(), "key {} out of range", key);
		let index = self.sparse[key as usize] as usize;
		if index < self.members && self.dense[index] == key {
			self.counts[index] += val;
		} else {
			let index = self.members;
			self.sparse[key as usize] = index as u32;
			self.dense[index] = key;
			self.counts[index] = val;
			self.members += 1;
		}
	}

	/// Returns the accumulated count for `key`, or 0 if absent.
	pub fn get(&self, key: u32) -> u32 {
		let index = self.sparse[key as usize] as usize;
		if index < self.members && self.dense[index] == key {
			self.counts[index]
		} else {
			0
		}
	}

	/// Iterates over `(key, count)` pairs in insertion order.
	pub fn iter(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
		self.dense[..self.members]
			.iter()
			.zip(&self.counts[..self.members])
			.map(|(&key, &count)| (key, count))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn absent_keys_count_zero() {
		let set = SparseSet::new(16);
		for key in 0..16 {
			assert_eq!(set.get(key), 0);
		}
		assert_eq!(set.len(), 0);
	}

	#[test]
	fn add_accumulates() {
		let mut set = SparseSet::new(8);
		set.add(3, 2);
		set.add(3, 5);
		assert_eq!(set.get(3), 7);
		assert_eq!(set.len(), 1);

		// split accumulation equals a single add of the sum
		let mut other = SparseSet::new(8);
		other.add(3, 7);
		assert_eq!(other.get(3), set.get(3));
	}

	#[test]
	fn zero_delta_does_not_change_counts() {
		let mut set = SparseSet::new(8);
		set.add(1, 4);
		set.add(1, 0);
		assert_eq!(set.get(1), 4);
	}

	#[test]
	fn clear_is_idempotent_reset() {
		let mut set = SparseSet::new(8);
		set.add(0, 1);
		set.add(7, 9);
		set.clear();
		assert_eq!(set.len(), 0);
		for key in 0..8 {
			assert_eq!(set.get(key), 0);
		}
		set.clear();
		assert_eq!(set.len(), 0);
	}

	#[test]
	fn stale_inverse_entries_are_harmless_after_clear() {
		let mut set = SparseSet::new(8);
		set.add(5, 3);
		set.clear();
		// re-add a different key; key 5's stale inverse entry must not
		// make it look present
		set.add(2, 1);
		assert_eq!(set.get(5), 0);
		assert_eq!(set.get(2), 1);
	}

	#[test]
	fn iterates_in_insertion_order() {
		let mut set = SparseSet::new(8);
		set.add(6, 1);
		set.add(0, 2);
		set.add(3, 3);
		set.add(6, 1);
		let pairs: Vec<(u32, u32)> = set.iter().collect();
		assert_eq!(pairs, vec![(6, 2), (0, 2), (3, 3)]);
	}
}
