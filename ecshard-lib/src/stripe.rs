use crate::errors::{EcShardError, Result};
use std::io::Read;

/// A fixed-capacity slice of the original content, zero-padded past `valid_length`.
#[derive(Clone, Debug, PartialEq)]
pub struct Stripe {
    index: u32,
    valid_length: u32,
    data: Vec<u8>,
}

impl Stripe {
    pub fn get_index(&self) -> u32 {
        self.index
    }

    pub fn get_valid_length(&self) -> u32 {
        self.valid_length
    }

    /// Whole padded stripe, always exactly the stripe capacity long.
    pub fn get_data(&self) -> &[u8] {
        &self.data
    }

    /// Splits the padded stripe into `shard_size` wide data shards, in shard index order.
    pub fn data_shards(&self, shard_size: usize) -> Vec<&[u8]> {
        self.data.chunks_exact(shard_size).collect()
    }
}

/// Number of stripes of `capacity` bytes needed to carry `total_len` bytes.
pub fn num_stripes(total_len: u64, capacity: usize) -> u64 {
    total_len.div_ceil(capacity as u64)
}

/// Walks a byte source stripe by stripe. The source must yield exactly `total_len` bytes.
pub struct StripePlanner<R> {
    source: R,
    total_len: u64,
    capacity: usize,
    num_stripes: u32,
    next_index: u32,
}

impl<R: Read> StripePlanner<R> {
    /// Prepares to read `total_len` bytes from `source` in stripes of `capacity` bytes.
    ///
    /// # Returns
    ///
    /// Returns a `Result` which is:
    /// - `Ok(StripePlanner)` ready to yield `ceil(total_len / capacity)` stripes.
    /// - `Err(EcShardError::TooManyStripes)` if the stripe count doesn't fit a 32-bit stripe index.
    pub fn new(source: R, total_len: u64, capacity: usize) -> Result<Self> {
        let num_stripes = num_stripes(total_len, capacity);
        let num_stripes = u32::try_from(num_stripes).map_err(|_| EcShardError::TooManyStripes {
            total_size: total_len,
            num_stripes,
        })?;

        Ok(StripePlanner {
            source,
            total_len,
            capacity,
            num_stripes,
            next_index: 0,
        })
    }

    pub fn get_num_stripes(&self) -> u32 {
        self.num_stripes
    }

    fn read_stripe(&mut self, index: u32) -> Result<Stripe> {
        let offset = index as u64 * self.capacity as u64;
        let valid_length = (self.total_len - offset).min(self.capacity as u64) as usize;

        let mut data = vec![0u8; self.capacity];
        self.source
            .read_exact(&mut data[..valid_length])
            .map_err(|source| EcShardError::SourceRead { stripe: index, source })?;

        Ok(Stripe {
            index,
            valid_length: valid_length as u32,
            data,
        })
    }
}

impl<R: Read> Iterator for StripePlanner<R> {
    type Item = Result<Stripe>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_index >= self.num_stripes {
            return None;
        }

        let index = self.next_index;
        self.next_index += 1;

        Some(self.read_stripe(index))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.num_stripes - self.next_index) as usize;
        (remaining, Some(remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::{Stripe, StripePlanner, num_stripes};
    use crate::errors::EcShardError;
    use rand::Rng;
    use std::io::Cursor;

    const CAPACITY: usize = 6 * 16;

    #[test]
    fn stripe_count_is_ceiling_of_length_over_capacity() {
        assert_eq!(num_stripes(0, CAPACITY), 0);
        assert_eq!(num_stripes(1, CAPACITY), 1);
        assert_eq!(num_stripes(CAPACITY as u64 - 1, CAPACITY), 1);
        assert_eq!(num_stripes(CAPACITY as u64, CAPACITY), 1);
        assert_eq!(num_stripes(CAPACITY as u64 + 1, CAPACITY), 2);
        assert_eq!(num_stripes(7_340_032, 6 << 20), 2);
    }

    #[test]
    fn prop_test_stripes_cover_source_and_pad_with_zeros() {
        const NUM_TEST_ITERATIONS: usize = 32;
        let mut rng = rand::rng();

        (0..NUM_TEST_ITERATIONS).for_each(|_| {
            let len = rng.random_range(0..=CAPACITY * 5);
            let mut data = vec![0u8; len];
            rng.fill(&mut data[..]);

            let planner = StripePlanner::new(Cursor::new(data.clone()), len as u64, CAPACITY).expect("Must be able to plan stripes");
            let stripes = planner.collect::<Result<Vec<Stripe>, _>>().expect("Must be able to read stripes");

            assert_eq!(stripes.len(), len.div_ceil(CAPACITY));
            assert_eq!(stripes.iter().map(|stripe| stripe.get_valid_length() as usize).sum::<usize>(), len);

            for (i, stripe) in stripes.iter().enumerate() {
                let valid = stripe.get_valid_length() as usize;

                assert_eq!(stripe.get_index() as usize, i);
                assert_eq!(stripe.get_data().len(), CAPACITY);
                assert_eq!(valid, (len - i * CAPACITY).min(CAPACITY));
                assert_eq!(&stripe.get_data()[..valid], &data[i * CAPACITY..i * CAPACITY + valid]);
                assert!(stripe.get_data()[valid..].iter().all(|&byte| byte == 0));
            }
        });
    }

    #[test]
    fn data_shards_are_verbatim_slices() {
        let data = (0..CAPACITY as u8).collect::<Vec<u8>>();
        let mut planner = StripePlanner::new(Cursor::new(data.clone()), CAPACITY as u64, CAPACITY).unwrap();
        let stripe = planner.next().unwrap().unwrap();

        let shards = stripe.data_shards(16);
        assert_eq!(shards.len(), 6);
        assert_eq!(shards[2], &data[32..48]);
        assert!(planner.next().is_none());
    }

    #[test]
    fn short_source_fails_with_stripe_index() {
        let data = vec![1u8; CAPACITY + 10];
        let planner = StripePlanner::new(Cursor::new(data), CAPACITY as u64 + 20, CAPACITY).unwrap();
        let results = planner.collect::<Vec<_>>();

        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(EcShardError::SourceRead { stripe: 1, .. })));
    }

    #[test]
    fn rejects_stripe_counts_beyond_u32() {
        let result = StripePlanner::new(Cursor::new(Vec::<u8>::new()), u64::MAX, 1);
        assert!(matches!(result, Err(EcShardError::TooManyStripes { .. })));
    }
}
