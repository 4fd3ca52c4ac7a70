use alloc::vec::Vec;
use core::fmt::Debug;
use core::mem;

/// Number of slots a table starts with when no capacity is given.
const DEFAULT_CAPACITY: usize = 1024;

/// Occupancy above this percentage of the slot count doubles the table.
const MAX_LOAD_PERCENT: u128 = 80;

/// Occupancy below this percentage of the slot count halves the table.
const MIN_LOAD_PERCENT: u128 = 25;

/// One cell of the backing array.
///
/// The payload is replaced wholesale on occupation and cleared wholesale on
/// vacancy; it is never mutated field-by-field in place.
#[derive(Clone, Debug)]
enum Slot<T> {
    Empty,
    Occupied {
        /// Full hash of the entry. The hash function is consistent for equal
        /// keys by contract, so removal and rehashing re-derive primary slots
        /// from this without access to the hasher.
        hash: u64,
        /// Index of the next slot on this bucket's collision chain.
        link: Option<usize>,
        entry: T,
    },
}

impl<T> Slot<T> {
    #[inline(always)]
    fn is_empty(&self) -> bool {
        matches!(self, Slot::Empty)
    }
}

/// A low-level hash table using coalesced hashing.
///
/// `SlotTable<T>` stores values of type `T` in a flat array of slots and
/// provides insertion, lookup, and removal. Like a raw hash table, it does
/// not hash for you: every operation takes the entry's 64-bit hash and an
/// equality predicate. An entry's *primary slot* is `hash % capacity`; a
/// colliding entry is placed into the highest-indexed empty slot instead and
/// linked onto the primary slot's chain through an in-table index, so chains
/// from different buckets coalesce over the same storage.
///
/// The table doubles when occupancy exceeds 80% of the slot count and shrinks
/// to roughly half when it drops below 25%, rebuilding every chain against
/// the new capacity.
///
/// ## Example
///
/// ```rust
/// # use core::hash::Hash;
/// # use core::hash::Hasher;
/// #
/// # use coalesce_map::SlotTable;
/// # use siphasher::sip::SipHasher;
/// #
/// # fn hash_str(s: &str) -> u64 {
/// #     let mut hasher = SipHasher::new();
/// #     s.hash(&mut hasher);
/// #     hasher.finish()
/// # }
/// #
/// let mut table: SlotTable<(String, i32)> = SlotTable::new();
/// table
///     .entry(hash_str("a"), |(k, _)| k == "a")
///     .or_insert(("a".to_string(), 1));
///
/// assert_eq!(
///     table.find(hash_str("a"), |(k, _)| k == "a"),
///     Some(&("a".to_string(), 1)),
/// );
/// assert!(table.find(hash_str("b"), |(k, _)| k == "b").is_none());
/// ```
#[derive(Clone, Debug)]
pub struct SlotTable<T> {
    slots: Vec<Slot<T>>,
    len: usize,
    /// Highest index that may still be empty. Placement walks it strictly
    /// downward until a free slot turns up; it never moves back up between
    /// rehashes, and every rehash resets it to `capacity - 1`.
    largest_empty: usize,
}

impl<T> SlotTable<T> {
    /// Creates an empty table with the default slot count.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates an empty table with `capacity` slots.
    ///
    /// The capacity is the raw slot count, not an element bound: the table
    /// resizes itself once occupancy crosses 80% of it. A requested capacity
    /// of zero is bumped to one slot, since a primary slot is computed as
    /// `hash % capacity`.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let mut slots = Vec::new();
        slots.resize_with(capacity, || Slot::Empty);
        SlotTable {
            slots,
            len: 0,
            largest_empty: capacity - 1,
        }
    }

    /// Returns the number of entries in the table.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the table contains no entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the current slot count.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline(always)]
    fn primary_slot(&self, hash: u64) -> usize {
        // True modulo rather than masking: shrinking to (capacity + 1) / 2
        // leaves non-power-of-two slot counts.
        (hash % self.slots.len() as u64) as usize
    }

    /// Walks the chain rooted at `hash`'s primary slot, returning the index
    /// of the entry matching `eq`.
    fn find_index(&self, hash: u64, mut eq: impl FnMut(&T) -> bool) -> Option<usize> {
        let mut cursor = Some(self.primary_slot(hash));
        while let Some(index) = cursor {
            match &self.slots[index] {
                // Only the primary slot of an unused bucket can be empty;
                // chains link exclusively through occupied slots.
                Slot::Empty => return None,
                Slot::Occupied { link, entry, .. } => {
                    if eq(entry) {
                        return Some(index);
                    }
                    cursor = *link;
                }
            }
        }
        None
    }

    fn occupied(&self, index: usize) -> &T {
        match &self.slots[index] {
            Slot::Occupied { entry, .. } => entry,
            Slot::Empty => unreachable!("index does not refer to an occupied slot"),
        }
    }

    fn occupied_mut(&mut self, index: usize) -> &mut T {
        match &mut self.slots[index] {
            Slot::Occupied { entry, .. } => entry,
            Slot::Empty => unreachable!("index does not refer to an occupied slot"),
        }
    }

    /// Returns a reference to the entry matching `eq` on the chain for
    /// `hash`, if any.
    ///
    /// ```rust
    /// # use coalesce_map::SlotTable;
    /// let mut table: SlotTable<u64> = SlotTable::with_capacity(8);
    /// table.entry(3, |&v| v == 30).or_insert(30);
    ///
    /// assert_eq!(table.find(3, |&v| v == 30), Some(&30));
    /// assert_eq!(table.find(3, |&v| v == 31), None);
    /// ```
    pub fn find(&self, hash: u64, eq: impl FnMut(&T) -> bool) -> Option<&T> {
        let index = self.find_index(hash, eq)?;
        Some(self.occupied(index))
    }

    /// Returns a mutable reference to the entry matching `eq` on the chain
    /// for `hash`, if any.
    pub fn find_mut(&mut self, hash: u64, eq: impl FnMut(&T) -> bool) -> Option<&mut T> {
        let index = self.find_index(hash, eq)?;
        Some(self.occupied_mut(index))
    }

    /// Locates the entry for `hash`/`eq`, returning an [`Entry`] for
    /// in-place manipulation.
    ///
    /// A vacant entry defers all table mutation until a value is actually
    /// inserted; locating an entry on its own never resizes the table.
    pub fn entry(&mut self, hash: u64, eq: impl FnMut(&T) -> bool) -> Entry<'_, T> {
        match self.find_index(hash, eq) {
            Some(index) => Entry::Occupied(OccupiedEntry { table: self, index }),
            None => Entry::Vacant(VacantEntry { table: self, hash }),
        }
    }

    /// Removes and returns the entry matching `eq` on the chain for `hash`.
    ///
    /// Removal repairs the chain the entry belonged to and then applies the
    /// shrink policy. An empty primary slot means the bucket is unused and
    /// the operation returns immediately; any other miss still walked a
    /// chain, and the shrink check runs for it just as for a hit.
    pub fn remove(&mut self, hash: u64, eq: impl FnMut(&T) -> bool) -> Option<T> {
        if self.slots[self.primary_slot(hash)].is_empty() {
            return None;
        }
        let found = self.find_index(hash, eq);
        let removed = found.map(|index| self.detach(index));
        self.maybe_shrink();
        removed
    }

    /// Discards all entries and reinitializes the table at the default
    /// capacity.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Returns an iterator over the entries, in slot order.
    ///
    /// Slot order is an artifact of physical placement: it is not insertion
    /// order, and it is not stable across inserts, removals, or resizes.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            inner: self.slots.iter(),
        }
    }

    /// Returns an iterator yielding mutable references to the entries, in
    /// slot order.
    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        IterMut {
            inner: self.slots.iter_mut(),
        }
    }

    /// Places an entry known not to be present, returning its slot index.
    ///
    /// If the primary slot is free the entry occupies it directly. Otherwise
    /// the highest still-empty slot is claimed and linked onto the tail of
    /// the primary slot's chain.
    fn place(&mut self, hash: u64, entry: T) -> usize {
        let head = self.primary_slot(hash);
        if self.slots[head].is_empty() {
            self.slots[head] = Slot::Occupied {
                hash,
                link: None,
                entry,
            };
            self.len += 1;
            return head;
        }

        let mut tail = head;
        while let Slot::Occupied {
            link: Some(next), ..
        } = &self.slots[tail]
        {
            tail = *next;
        }

        // The load policy keeps the table strictly under-full, so the scan
        // finds an empty slot before running off the bottom.
        while !self.slots[self.largest_empty].is_empty() {
            debug_assert!(self.largest_empty > 0);
            self.largest_empty -= 1;
        }
        let free = self.largest_empty;

        if let Slot::Occupied { link, .. } = &mut self.slots[tail] {
            *link = Some(free);
        }
        self.slots[free] = Slot::Occupied {
            hash,
            link: None,
            entry,
        };
        self.len += 1;
        free
    }

    /// Applies the grow policy after a placement, returning the slot index
    /// the placed entry ended up at.
    fn maybe_grow(&mut self, placed: usize) -> usize {
        if self.len as u128 * 100 > self.slots.len() as u128 * MAX_LOAD_PERCENT {
            let capacity = self.slots.len() * 2;
            self.rehash(capacity, Some(placed))
                .expect("tracked entry survives a rehash")
        } else {
            placed
        }
    }

    fn maybe_shrink(&mut self) {
        if (self.len as u128) * 100 < self.slots.len() as u128 * MIN_LOAD_PERCENT {
            // Rounds up so the capacity never reaches zero.
            let capacity = (self.slots.len() + 1) / 2;
            self.rehash(capacity, None);
        }
    }

    /// Rebuilds the table at `new_capacity`, redistributing every entry.
    ///
    /// Entries are drained in slot order and re-placed against the new
    /// capacity, so chains are rebuilt from scratch rather than preserved.
    /// Returns the post-rehash index of the entry that lived at `track`.
    fn rehash(&mut self, new_capacity: usize, track: Option<usize>) -> Option<usize> {
        let old = mem::take(&mut self.slots);
        let mut drained = Vec::with_capacity(self.len);
        let mut track_position = None;
        for (index, slot) in old.into_iter().enumerate() {
            if let Slot::Occupied { hash, entry, .. } = slot {
                if track == Some(index) {
                    track_position = Some(drained.len());
                }
                drained.push((hash, entry));
            }
        }

        let new_capacity = new_capacity.max(1);
        self.slots.resize_with(new_capacity, || Slot::Empty);
        self.largest_empty = new_capacity - 1;
        self.len = 0;

        let mut tracked = None;
        for (position, (hash, entry)) in drained.into_iter().enumerate() {
            let index = self.place(hash, entry);
            if track_position == Some(position) {
                tracked = Some(index);
            }
        }
        tracked
    }

    /// Removes the entry at `index` and repairs the chain it belonged to.
    ///
    /// The removed slot becomes a hole. Every entry that followed it on the
    /// chain is detached and redistributed in original link order: an entry
    /// whose primary slot is the hole migrates into it (and the hole travels
    /// to the slot it vacates), while an entry that was only reachable here
    /// because it borrowed a nearby storage slot is re-appended to the tail
    /// of the chain of the bucket it actually hashes to. The suffix is
    /// collected as a worklist up front so links can be rewritten without
    /// aliasing the chain being walked.
    fn detach(&mut self, index: usize) -> T {
        let head = match &self.slots[index] {
            Slot::Occupied { hash, .. } => self.primary_slot(*hash),
            Slot::Empty => unreachable!("detach of an empty slot"),
        };

        // Walk from the primary slot to find the predecessor, then unlink.
        let mut prev = None;
        let mut cursor = head;
        while cursor != index {
            match &self.slots[cursor] {
                Slot::Occupied {
                    link: Some(next), ..
                } => {
                    prev = Some(cursor);
                    cursor = *next;
                }
                _ => unreachable!("slot not reachable from its primary chain"),
            }
        }
        if let Some(prev) = prev
            && let Slot::Occupied { link, .. } = &mut self.slots[prev]
        {
            *link = None;
        }

        let mut hole = index;
        let (removed, follow) = match mem::replace(&mut self.slots[hole], Slot::Empty) {
            Slot::Occupied { link, entry, .. } => (entry, link),
            Slot::Empty => unreachable!("detach of an empty slot"),
        };

        // Collect the chain suffix as a worklist, severing its links.
        let mut suffix = Vec::new();
        let mut cursor = follow;
        while let Some(next) = cursor {
            match &mut self.slots[next] {
                Slot::Occupied { link, .. } => {
                    cursor = link.take();
                    suffix.push(next);
                }
                Slot::Empty => unreachable!("chain link to an empty slot"),
            }
        }

        for index in suffix {
            let primary = match &self.slots[index] {
                Slot::Occupied { hash, .. } => self.primary_slot(*hash),
                Slot::Empty => unreachable!("worklist slot vacated twice"),
            };
            if primary == hole {
                // Same bucket as the vacated position: the entry takes over
                // the hole, and the hole travels to its old slot.
                self.slots[hole] = mem::replace(&mut self.slots[index], Slot::Empty);
                hole = index;
            } else {
                // Reachable only through the removed entry's chain; re-append
                // it to the bucket it actually belongs to.
                let mut tail = primary;
                while let Slot::Occupied {
                    link: Some(next), ..
                } = &self.slots[tail]
                {
                    tail = *next;
                }
                if let Slot::Occupied { link, .. } = &mut self.slots[tail] {
                    *link = Some(index);
                }
            }
        }

        self.len -= 1;
        removed
    }
}

impl<T> Default for SlotTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A view into a single location in a [`SlotTable`], which is either vacant
/// or occupied.
///
/// Constructed by [`SlotTable::entry`].
pub enum Entry<'a, T> {
    /// No entry matched; inserting here runs the placement algorithm.
    Vacant(VacantEntry<'a, T>),
    /// An entry matched the equality predicate.
    Occupied(OccupiedEntry<'a, T>),
}

impl<'a, T> Entry<'a, T> {
    /// Inserts `default` if the entry is vacant, returning a mutable
    /// reference to the value in place.
    pub fn or_insert(self, default: T) -> &'a mut T {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Inserts a value computed from `default` if the entry is vacant,
    /// returning a mutable reference to the value in place.
    pub fn or_insert_with(self, default: impl FnOnce() -> T) -> &'a mut T {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }
}

/// A view into a vacant location in a [`SlotTable`].
pub struct VacantEntry<'a, T> {
    table: &'a mut SlotTable<T>,
    hash: u64,
}

impl<'a, T> VacantEntry<'a, T> {
    /// Inserts `entry` and returns a mutable reference to it.
    ///
    /// Runs the placement algorithm and then the grow policy; the returned
    /// reference is valid even when the insertion triggered a rehash.
    pub fn insert(self, entry: T) -> &'a mut T {
        let placed = self.table.place(self.hash, entry);
        let placed = self.table.maybe_grow(placed);
        self.table.occupied_mut(placed)
    }
}

/// A view into an occupied location in a [`SlotTable`].
pub struct OccupiedEntry<'a, T> {
    table: &'a mut SlotTable<T>,
    index: usize,
}

impl<'a, T> OccupiedEntry<'a, T> {
    /// Returns a reference to the entry.
    pub fn get(&self) -> &T {
        self.table.occupied(self.index)
    }

    /// Returns a mutable reference to the entry.
    pub fn get_mut(&mut self) -> &mut T {
        self.table.occupied_mut(self.index)
    }

    /// Converts the view into a mutable reference tied to the table's
    /// lifetime.
    pub fn into_mut(self) -> &'a mut T {
        self.table.occupied_mut(self.index)
    }

    /// Removes the entry from the table and returns it, repairing the chain
    /// it belonged to and applying the shrink policy.
    pub fn remove(self) -> T {
        let entry = self.table.detach(self.index);
        self.table.maybe_shrink();
        entry
    }
}

/// An iterator over the entries of a [`SlotTable`], in slot order.
pub struct Iter<'a, T> {
    inner: core::slice::Iter<'a, Slot<T>>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        for slot in &mut self.inner {
            if let Slot::Occupied { entry, .. } = slot {
                return Some(entry);
            }
        }
        None
    }
}

/// A mutable iterator over the entries of a [`SlotTable`], in slot order.
pub struct IterMut<'a, T> {
    inner: core::slice::IterMut<'a, Slot<T>>,
}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = &'a mut T;

    fn next(&mut self) -> Option<Self::Item> {
        for slot in &mut self.inner {
            if let Slot::Occupied { entry, .. } = slot {
                return Some(entry);
            }
        }
        None
    }
}

/// An owning iterator over the entries of a [`SlotTable`], in slot order.
pub struct IntoIter<T> {
    inner: alloc::vec::IntoIter<Slot<T>>,
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        for slot in &mut self.inner {
            if let Slot::Occupied { entry, .. } = slot {
                return Some(entry);
            }
        }
        None
    }
}

impl<T> IntoIterator for SlotTable<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            inner: self.slots.into_iter(),
        }
    }
}

impl<'a, T> IntoIterator for &'a SlotTable<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T> IntoIterator for &'a mut SlotTable<T> {
    type Item = &'a mut T;
    type IntoIter = IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}
