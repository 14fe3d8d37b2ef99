use nipt_concordance::compare::{classify, TrioOutcome};
use nipt_concordance::tables::{MafTable, SingleCounts, Tally, TrioTable};
use nipt_concordance::types::{ComparisonOutcome, GenotypeCall, MafBin, Method, Verdict, DEFAULT_MIN_MAF, MAF_BINS};
use proptest::prelude::*;

fn arb_bin() -> impl Strategy<Value = MafBin> {
    (0..MAF_BINS).prop_map(|i| MafBin::from_index(i).unwrap())
}

fn arb_single_table() -> impl Strategy<Value = MafTable<SingleCounts>> {
    proptest::collection::vec((arb_bin(), proptest::collection::vec(0u64..1000, 8)), 0..20).prop_map(|cells| {
        let mut table = MafTable::<SingleCounts>::new();
        for (bin, values) in cells {
            table.bin_mut(bin).add(&SingleCounts::from_values(&values).unwrap());
        }
        table
    })
}

fn arb_verdict() -> impl Strategy<Value = Verdict> {
    prop_oneof![Just(Verdict::Correct), Just(Verdict::Wrong)]
}

fn arb_outcome() -> impl Strategy<Value = ComparisonOutcome> {
    (arb_bin(), arb_verdict(), proptest::option::of(arb_verdict())).prop_map(|(maf_bin, gt, alt)| ComparisonOutcome {
        maf_bin,
        gt,
        alt,
    })
}

proptest! {
    #[test]
    fn maf_bin_is_symmetric(k in 0u32..=100_000) {
        let af = k as f64 / 100_000.0;
        prop_assert_eq!(
            MafBin::from_frequency(af, DEFAULT_MIN_MAF),
            MafBin::from_frequency(1.0 - af, DEFAULT_MIN_MAF)
        );
    }

    #[test]
    fn exactly_one_gt_verdict_and_no_alt_penalty_for_hom_ref(
        called in proptest::array::uniform2(-1i32..4),
        truth in proptest::array::uniform2(-1i32..4),
    ) {
        let called = GenotypeCall::from_alleles(&called);
        let truth = GenotypeCall::from_alleles(&truth);
        let bin = MafBin::from_index(7).unwrap();
        match classify(called, truth, bin) {
            None => prop_assert!(called.is_empty()),
            Some(outcome) => {
                prop_assert_eq!(outcome.gt_correct() + outcome.gt_wrong(), 1);
                prop_assert!(outcome.alt_correct() + outcome.alt_wrong() <= 1);
                if called == GenotypeCall::from_alleles(&[0, 0]) {
                    prop_assert_eq!(outcome.alt_wrong(), 0);
                    prop_assert_eq!(outcome.alt, None);
                }
            }
        }
    }

    #[test]
    fn trio_partition_is_exhaustive(pairs in proptest::collection::vec((arb_outcome(), arb_outcome()), 0..200)) {
        let mut table = TrioTable::new();
        for (child, mother) in &pairs {
            table.record(&TrioOutcome::classify(child, mother));
        }
        let total = table.total();
        prop_assert_eq!(total.gt_evaluated(), pairs.len() as u64);
        prop_assert_eq!(total.alt_evaluated(), pairs.len() as u64);
        prop_assert!(total.gt_mom_correct <= total.gt_evaluated());
        prop_assert_eq!(total.gt_mom_correct + total.gt_mom_wrong(), total.gt_evaluated());
        prop_assert_eq!(total.alt_child_correct + total.alt_child_wrong(), total.alt_evaluated());
    }

    #[test]
    fn merge_order_does_not_matter(a in arb_single_table(), b in arb_single_table(), c in arb_single_table()) {
        let forward = MafTable::sum([&a, &b, &c]);
        let backward = MafTable::sum([&c, &b, &a]);
        prop_assert_eq!(&forward, &backward);
        prop_assert_eq!(forward.cumulative(), backward.cumulative());
    }

    #[test]
    fn cumulative_threshold_zero_is_total(table in arb_single_table()) {
        let cumulative = table.cumulative();
        let first = MafBin::from_index(0).unwrap();
        prop_assert_eq!(cumulative.bin(first), &table.total());
        prop_assert_eq!(cumulative.bin(MafBin::MAX), table.bin(MafBin::MAX));

        // Each threshold adds exactly its own bin to the next one.
        for i in 0..MAF_BINS - 1 {
            let here = MafBin::from_index(i).unwrap();
            let next = MafBin::from_index(i + 1).unwrap();
            let mut expected = cumulative.bin(next).clone();
            expected.add(table.bin(here));
            prop_assert_eq!(cumulative.bin(here), &expected);
        }
        prop_assert!(cumulative.bin(first).method(Method::Imputed).gt_true >= table.bin(first).imputed_gt_true);
    }
}
