// Hot paths: request filter decision and selector categorization

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use yg_core::dom::{Document, DomTree};
use yg_core::filter::{FilterRule, FilterSet, ListName};
use yg_core::selectors::SelectorSet;

const URLS: &[&str] = &[
    "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
    "https://www.youtube.com/youtubei/v1/player?key=abc",
    "https://i.ytimg.com/vi/dQw4w9WgXcQ/hqdefault.jpg",
    "https://rr3---sn-abc.googlevideo.com/videoplayback?expire=1&dur=15.000&gir=yes&lmt=1",
    "https://googleads.g.doubleclick.net/pagead/id",
    "https://www.youtube.com/api/stats/ads?ver=2&ns=yt",
];

fn custom_rules(n: usize) -> Vec<FilterRule> {
    (0..n)
        .filter_map(|i| FilterRule::parse(&format!("tracker{i}.example/*/pixel")))
        .collect()
}

fn bench_find_match(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_match");
    for size in [0usize, 100, 1000] {
        let mut set = FilterSet::builtin();
        set.set_list(ListName::Custom, custom_rules(size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &set, |b, set| {
            b.iter(|| {
                for url in URLS {
                    black_box(set.find_match(black_box(url)));
                }
            })
        });
    }
    group.finish();
}

fn bench_categorize(c: &mut Criterion) {
    let mut doc = Document::new();
    let body = doc.body();
    for i in 0..200 {
        let row = doc.append(body, "ytd-rich-item-renderer", &[]);
        if i % 20 == 0 {
            doc.set_attribute(row, "is-ad", "");
        }
        doc.append(row, "div", &[("id", "content"), ("class", "style-scope")]);
    }
    let set = SelectorSet::builtin();
    let nodes: Vec<_> = {
        let mut all = Vec::new();
        let mut stack = vec![doc.root()];
        while let Some(node) = stack.pop() {
            all.push(node);
            stack.extend(doc.children(node));
        }
        all
    };

    c.bench_function("categorize_page", |b| {
        b.iter(|| {
            nodes
                .iter()
                .filter(|node| set.categorize(&doc, **node).is_some())
                .count()
        })
    });
}

criterion_group!(benches, bench_find_match, bench_categorize);
criterion_main!(benches);
