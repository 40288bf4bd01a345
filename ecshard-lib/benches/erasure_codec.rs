use ecshard_lib::{CodecConfig, ErasureCodec};
use rand::{Rng, seq::index};
use std::{fmt::Debug, time::Duration};

#[global_allocator]
static ALLOC: divan::AllocProfiler = divan::AllocProfiler::system();

fn main() {
    divan::Divan::default().bytes_format(divan::counter::BytesFormat::Binary).main();
}

struct StripeConfig {
    data_shards: usize,
    parity_shards: usize,
    shard_size: usize,
}

impl StripeConfig {
    fn codec(&self) -> ErasureCodec {
        let config = CodecConfig::new(self.data_shards, self.parity_shards, self.shard_size).unwrap();
        ErasureCodec::new(&config).unwrap()
    }

    fn random_data_shards(&self) -> Vec<Vec<u8>> {
        let mut rng = rand::rng();
        (0..self.data_shards)
            .map(|_| (0..self.shard_size).map(|_| rng.random()).collect::<Vec<u8>>())
            .collect()
    }
}

fn bytes_to_human_readable(bytes: usize) -> String {
    let units = ["B", "KB", "MB", "GB", "TB"];
    let mut bytes = bytes as f64;
    let mut unit_index = 0;

    while bytes >= 1024.0 && unit_index < units.len() - 1 {
        bytes /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", bytes, units[unit_index])
}

impl Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&format!(
            "{}+{} stripe of {} shards",
            self.data_shards,
            self.parity_shards,
            &bytes_to_human_readable(self.shard_size),
        ))
    }
}

const ARGS: &[StripeConfig] = &[
    StripeConfig {
        data_shards: 6,
        parity_shards: 2,
        shard_size: 1usize << 16,
    },
    StripeConfig {
        data_shards: 6,
        parity_shards: 2,
        shard_size: 1usize << 20,
    },
    StripeConfig {
        data_shards: 10,
        parity_shards: 4,
        shard_size: 1usize << 20,
    },
    StripeConfig {
        data_shards: 16,
        parity_shards: 4,
        shard_size: 1usize << 22,
    },
];

#[divan::bench(args = ARGS, max_time = Duration::from_secs(100), skip_ext_time = true)]
fn encode_stripe(bencher: divan::Bencher, stripe_config: &StripeConfig) {
    let codec = stripe_config.codec();

    bencher
        .with_inputs(|| stripe_config.random_data_shards())
        .input_counter(|shards| divan::counter::BytesCount::new(shards.len() * stripe_config.shard_size))
        .bench_values(|shards| divan::black_box(codec.encode(divan::black_box(&shards))));
}

#[divan::bench(args = ARGS, max_time = Duration::from_secs(100), skip_ext_time = true)]
fn reconstruct_stripe(bencher: divan::Bencher, stripe_config: &StripeConfig) {
    let codec = stripe_config.codec();

    bencher
        .with_inputs(|| {
            let mut rng = rand::rng();
            let data = stripe_config.random_data_shards();
            let parity = codec.encode(&data).unwrap();

            let mut shards = data.into_iter().chain(parity).map(Some).collect::<Vec<Option<Vec<u8>>>>();
            for shard_index in index::sample(&mut rng, shards.len(), stripe_config.parity_shards).iter() {
                shards[shard_index] = None;
            }

            shards
        })
        .input_counter(|_| divan::counter::BytesCount::new(stripe_config.data_shards * stripe_config.shard_size))
        .bench_values(|shards| divan::black_box(codec.reconstruct(divan::black_box(shards))));
}
