use ecshard_lib::{CodecConfig, RestorePipeline, SilentProgress, SplitPipeline, shard_path};
use rand::{Rng, seq::index};
use std::{fmt::Debug, io::Cursor, path::Path, time::Duration};

#[global_allocator]
static ALLOC: divan::AllocProfiler = divan::AllocProfiler::system();

fn main() {
    divan::Divan::default().bytes_format(divan::counter::BytesFormat::Binary).main();
}

struct ObjectConfig {
    data_byte_len: usize,
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

impl Debug for ObjectConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&format!("{} object", &bytes_to_human_readable(self.data_byte_len)))
    }
}

const ARGS: &[ObjectConfig] = &[
    ObjectConfig { data_byte_len: 1usize << 20 },
    ObjectConfig { data_byte_len: 1usize << 24 },
    ObjectConfig { data_byte_len: 1usize << 26 },
    ObjectConfig { data_byte_len: 1usize << 28 },
];

fn random_object(len: usize) -> Vec<u8> {
    let mut rng = rand::rng();
    (0..len).map(|_| rng.random()).collect::<Vec<u8>>()
}

fn split_into(dir: &Path, data: Vec<u8>) {
    SplitPipeline::new(CodecConfig::default())
        .unwrap()
        .split(&mut Cursor::new(data), &dir.join("fragments"), &dir.join("object.meta"), "bench.bin", &mut SilentProgress)
        .unwrap();
}

#[divan::bench(args = ARGS, max_time = Duration::from_secs(100), skip_ext_time = true)]
fn split_object(bencher: divan::Bencher, object_config: &ObjectConfig) {
    let pipeline = SplitPipeline::new(CodecConfig::default()).unwrap();

    bencher
        .with_inputs(|| (tempfile::tempdir().unwrap(), random_object(object_config.data_byte_len)))
        .input_counter(|(_, data)| divan::counter::BytesCount::new(data.len()))
        .bench_values(|(dir, data)| {
            let _ = divan::black_box(pipeline.split(
                &mut Cursor::new(divan::black_box(data)),
                &dir.path().join("fragments"),
                &dir.path().join("object.meta"),
                "bench.bin",
                &mut SilentProgress,
            ));
            dir
        });
}

#[divan::bench(args = ARGS, max_time = Duration::from_secs(100), skip_ext_time = true)]
fn restore_degraded_object(bencher: divan::Bencher, object_config: &ObjectConfig) {
    let config = CodecConfig::default();
    let pipeline = RestorePipeline::new(config.clone()).unwrap();

    bencher
        .with_inputs(|| {
            let mut rng = rand::rng();
            let dir = tempfile::tempdir().unwrap();
            split_into(dir.path(), random_object(object_config.data_byte_len));

            let num_stripes = object_config.data_byte_len.div_ceil(config.stripe_capacity()) as u32;
            let fragments = dir.path().join("fragments");
            for stripe in 0..num_stripes {
                for shard in index::sample(&mut rng, config.total_shards(), config.parity_shards()).iter() {
                    std::fs::remove_file(shard_path(&fragments, stripe, shard as u32)).unwrap();
                }
            }

            dir
        })
        .input_counter(|_| divan::counter::BytesCount::new(object_config.data_byte_len))
        .bench_values(|dir| {
            let mut restored = Vec::with_capacity(object_config.data_byte_len);
            let _ = divan::black_box(pipeline.restore(
                &dir.path().join("fragments"),
                &dir.path().join("object.meta"),
                &mut restored,
                &mut SilentProgress,
            ));
            dir
        });
}
