use coinmatrix_cache::key::ChartDays;
use coinmatrix_cache::key::Dataset;
use proptest::prelude::*;

fn chart_days() -> impl Strategy<Value = ChartDays> {
    prop_oneof![(1u32..=3650).prop_map(ChartDays::Days), Just(ChartDays::Max)]
}

fn dataset() -> impl Strategy<Value = Dataset> {
    // CoinGecko ids are lowercase words joined with dashes.
    let coin_id = "[a-z0-9]{1,8}(-[a-z0-9]{1,8}){0,3}";
    prop_oneof![
        (1u32..=250).prop_map(|per_page| Dataset::Markets { per_page }),
        Just(Dataset::Global),
        Just(Dataset::Trending),
        (coin_id, chart_days()).prop_map(|(coin_id, days)| Dataset::Chart { coin_id, days }),
        "[A-Za-z0-9]{1,10}".prop_map(|symbol| Dataset::coin_detail(&symbol)),
    ]
}

proptest! {
    #[test]
    fn derivation_is_deterministic(dataset in dataset()) {
        prop_assert_eq!(dataset.cache_key(), dataset.clone().cache_key());
    }

    #[test]
    fn distinct_datasets_never_share_a_key(a in dataset(), b in dataset()) {
        if a != b {
            prop_assert_ne!(a.cache_key(), b.cache_key());
        }
    }

    #[test]
    fn chart_days_round_trip_through_text(days in chart_days()) {
        prop_assert_eq!(days.to_string().parse::<ChartDays>(), Ok(days));
    }
}
