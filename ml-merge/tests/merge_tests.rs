use std::collections::BTreeSet;
use std::sync::{Arc, Once};

use ml_merge::{
    BufferConfig, BuildOptions, CategoryRegistry, Dataset, DatasetCard, DatasetInfo, Error,
    MergeDataset, MergeMode, SplitConfig, Stream, StreamBuilder,
};
use ml_merge_core::InMemoryStreamBuilder;
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use test_case::test_case;

static TRACING: Once = Once::new();

fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

/// Datapoint as a downstream loader would see it: an image reference, no pixels
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct PageRef {
    dataset: &'static str,
    index: u32,
}

fn pages(dataset: &'static str, count: u32) -> Vec<PageRef> {
    (0..count).map(|index| PageRef { dataset, index }).collect()
}

fn dataset(
    name: &'static str,
    count: u32,
    categories: CategoryRegistry,
) -> Arc<dyn Dataset<PageRef>> {
    let builder: Arc<dyn StreamBuilder<PageRef>> =
        Arc::new(InMemoryStreamBuilder::new(pages(name, count)).with_categories(categories));
    Arc::new(DatasetCard::new(DatasetInfo::new(name), builder).unwrap())
}

fn two_datasets(first: u32, second: u32) -> MergeDataset<PageRef> {
    init_tracing();
    MergeDataset::new(vec![
        dataset("publaynet", first, CategoryRegistry::new().with_category("text", ["text"])),
        dataset("pubtabnet", second, CategoryRegistry::new().with_category("table", ["table"])),
    ])
    .unwrap()
}

#[test]
fn streaming_preserves_dataset_order() {
    let merged = two_datasets(10, 10);

    let items: Vec<_> = merged.dataflow().build(&BuildOptions::new()).unwrap().collect();

    assert_eq!(items.len(), 20);
    assert_eq!(items[..10], pages("publaynet", 10)[..]);
    assert_eq!(items[10..], pages("pubtabnet", 10)[..]);
}

#[test]
fn streaming_ignores_split_option() {
    let merged = two_datasets(4, 6);
    let count = merged
        .dataflow()
        .build(&BuildOptions::new().split("val"))
        .unwrap()
        .count();
    assert_eq!(count, 10);
}

#[test]
fn categories_are_merged_at_construction() {
    let merged = two_datasets(1, 1);
    let names: Vec<_> = merged.categories().unwrap().category_names().collect();
    assert_eq!(names, ["table", "text"]);
}

#[test]
fn sub_categories_need_every_defining_dataset() {
    init_tracing();
    let with_cells = CategoryRegistry::new()
        .with_category("table", ["table"])
        .with_sub_category("table", "cell", ["body"])
        .unwrap()
        .with_category("text", ["text"])
        .with_sub_category("text", "reading_order", ["1", "2"])
        .unwrap();
    let without_cells = CategoryRegistry::new().with_category("table", ["table"]);

    let merged = MergeDataset::new(vec![
        dataset("a", 1, with_cells),
        dataset("b", 1, without_cells),
    ])
    .unwrap();

    let categories = merged.categories().unwrap();
    assert!(categories.sub_category_values("table", "cell").is_none());
    assert_eq!(
        categories.sub_category_values("text", "reading_order").map(BTreeSet::len),
        Some(2)
    );
}

#[test]
fn nameless_dataset_is_rejected() {
    struct Nameless {
        info: DatasetInfo,
        builder: Arc<dyn StreamBuilder<PageRef>>,
    }

    impl Dataset<PageRef> for Nameless {
        fn info(&self) -> &DatasetInfo {
            &self.info
        }

        fn dataflow(&self) -> Arc<dyn StreamBuilder<PageRef>> {
            Arc::clone(&self.builder)
        }

        fn categories(&self) -> Option<&CategoryRegistry> {
            None
        }
    }

    let nameless: Arc<dyn Dataset<PageRef>> = Arc::new(Nameless {
        info: DatasetInfo::default(),
        builder: Arc::new(InMemoryStreamBuilder::new(pages("x", 3))),
    });

    let result = MergeDataset::new(vec![dataset("a", 1, CategoryRegistry::new()), nameless]);
    assert!(matches!(result, Err(Error::MissingDescriptor(_))));
}

#[test_case(0 => matches Err(Error::InsufficientStreams { streams: 0, datasets: 2 }) ; "none")]
#[test_case(1 => matches Err(Error::InsufficientStreams { streams: 1, datasets: 2 }) ; "fewer than datasets")]
#[test_case(2 => matches Ok(_) ; "one per dataset")]
#[test_case(3 => matches Ok(_) ; "more than datasets")]
fn explicit_stream_count(count: u32) -> Result<(), Error> {
    let mut merged = two_datasets(5, 5);
    let streams = (0..count)
        .map(|index| Stream::from_vec(vec![PageRef { dataset: "explicit", index }]))
        .collect();
    merged.explicit_dataflows(streams)
}

#[test]
fn explicit_streams_are_chained_in_assignment_order() {
    let mut merged = two_datasets(10, 10);
    merged
        .explicit_dataflows(vec![
            Stream::from_vec(pages("second", 2)),
            Stream::from_vec(pages("first", 3)),
            Stream::from_vec(pages("third", 1)),
        ])
        .unwrap();
    assert_eq!(merged.mode(), MergeMode::ExplicitDataflow);

    let items: Vec<_> = merged
        .dataflow()
        .build(&BuildOptions::new().max_datapoints(1).split("train"))
        .unwrap()
        .collect();

    let expected: Vec<_> = pages("second", 2)
        .into_iter()
        .chain(pages("first", 3))
        .chain(pages("third", 1))
        .collect();
    assert_eq!(items, expected);
}

#[test]
fn explicit_streams_from_differently_configured_builds() {
    let first = dataset("publaynet", 50, CategoryRegistry::new());
    let second = dataset("pubtabnet", 50, CategoryRegistry::new());
    let streams = vec![
        first.dataflow().build(&BuildOptions::new().max_datapoints(20)).unwrap(),
        second.dataflow().build(&BuildOptions::new().max_datapoints(30)).unwrap(),
    ];

    init_tracing();
    let mut merged = MergeDataset::new(vec![first, second]).unwrap();
    merged.explicit_dataflows(streams).unwrap();
    merged
        .buffer_datasets(&BuildOptions::new(), &BufferConfig::default().with_seed(4))
        .unwrap();

    assert_eq!(merged.buffered().unwrap().len(), 50);
}

#[test]
fn split_before_buffer_fails() {
    let mut merged = two_datasets(3, 3);
    let err = merged.split_datasets(&SplitConfig::default()).unwrap_err();
    assert!(matches!(err, Error::NotBuffered));
}

#[test]
fn buffer_options_are_forwarded() {
    let mut merged = two_datasets(10, 10);
    merged
        .buffer_datasets(
            &BuildOptions::new().max_datapoints(4),
            &BufferConfig::default().with_seed(8),
        )
        .unwrap();
    assert_eq!(merged.buffered().unwrap().len(), 8);
}

#[test]
fn buffer_and_split_twenty_items_with_test() {
    let mut merged = two_datasets(10, 10);
    let mut rng = ChaCha8Rng::seed_from_u64(99);

    merged
        .buffer_datasets_with_rng(&BuildOptions::new(), &BufferConfig::default(), &mut rng)
        .unwrap();
    let buffered: BTreeSet<PageRef> = merged.buffered().unwrap().iter().cloned().collect();
    assert_eq!(buffered.len(), 20);

    merged
        .split_datasets_with_rng(&SplitConfig::new(0.5, true), &mut rng)
        .unwrap();
    assert_eq!(merged.mode(), MergeMode::Split);

    let builder = merged.dataflow();
    let collect = |split: &str| -> Vec<PageRef> {
        builder.build(&BuildOptions::new().split(split)).unwrap().collect()
    };
    let (train, val, test) = (collect("train"), collect("val"), collect("test"));

    assert_eq!(train.len() + val.len() + test.len(), 20);
    assert!(val.len() == test.len() || val.len() == test.len() + 1);

    let union: BTreeSet<PageRef> = train.iter().chain(&val).chain(&test).cloned().collect();
    assert_eq!(union, buffered);

    let sizes = merged.split_sizes().unwrap();
    assert_eq!((sizes.train, sizes.val, sizes.test), (train.len(), val.len(), test.len()));
}

#[test]
fn split_builder_requires_split_name() {
    let mut merged = two_datasets(5, 5);
    merged
        .buffer_datasets(&BuildOptions::new(), &BufferConfig::default().with_seed(1))
        .unwrap();
    merged
        .split_datasets(&SplitConfig::new(0.2, false).with_seed(1))
        .unwrap();

    let builder = merged.dataflow();
    assert!(matches!(
        builder.build(&BuildOptions::new()),
        Err(Error::MissingOption(_))
    ));
    assert!(matches!(
        builder.build(&BuildOptions::new().split("test")),
        Err(Error::UnknownSplit(_))
    ));
    assert_eq!(builder.categories(), merged.categories());

    let bounded = builder
        .build(&BuildOptions::new().split("train").max_datapoints(2))
        .unwrap()
        .count();
    assert!(bounded <= 2);
}

#[test]
fn split_datasets_reports_held_out_share_in_expectation() {
    let mut merged = two_datasets(5_000, 5_000);
    merged
        .buffer_datasets(&BuildOptions::new(), &BufferConfig::default().with_seed(21))
        .unwrap();
    merged
        .split_datasets(&SplitConfig::new(0.1, false).with_seed(21))
        .unwrap();

    let sizes = merged.split_sizes().unwrap();
    assert_eq!(sizes.train + sizes.val, 10_000);
    assert_eq!(sizes.test, 0);
    // 0.1 * 10_000 = 1_000, sigma = 30
    assert!((820..=1_180).contains(&sizes.val), "val size {}", sizes.val);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_buffer_then_split_is_a_disjoint_cover(
        first in 0_u32..60,
        second in 0_u32..60,
        ratio in 0.0_f64..=1.0,
        seed in any::<u64>(),
    ) {
        let mut merged = two_datasets(first, second);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        merged
            .buffer_datasets_with_rng(&BuildOptions::new(), &BufferConfig::default(), &mut rng)
            .unwrap();
        merged
            .split_datasets_with_rng(&SplitConfig::new(ratio, false), &mut rng)
            .unwrap();

        let builder = merged.dataflow();
        let train: Vec<PageRef> = builder.build(&BuildOptions::new().split("train")).unwrap().collect();
        let val: Vec<PageRef> = builder.build(&BuildOptions::new().split("val")).unwrap().collect();

        prop_assert_eq!(train.len() + val.len(), (first + second) as usize);
        let union: BTreeSet<&PageRef> = train.iter().chain(&val).collect();
        prop_assert_eq!(union.len(), (first + second) as usize);
    }
}
