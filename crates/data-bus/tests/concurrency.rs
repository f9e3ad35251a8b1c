use std::sync::Arc;

use a11y_data_bus::{ElementId, InMemoryDataBus, Properties, SharedDataBus};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_puts_merge_every_property() {
    let bus = InMemoryDataBus::new();
    let mut handles = Vec::new();
    for worker in 0..8 {
        let bus = Arc::clone(&bus);
        handles.push(tokio::spawn(async move {
            for key in 0..50 {
                let mut props = Properties::new();
                props.insert(format!("worker_{worker}"), key.to_string());
                bus.put(ElementId::new(format!("li[text='item {key}']")), props);
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(bus.len(), 50);
    for key in 0..50 {
        let record = bus.get(&ElementId::new(format!("li[text='item {key}']")));
        assert_eq!(record.len(), 8, "record {key} lost a property");
        assert_eq!(record.get("worker_3"), Some(&key.to_string()));
    }
    assert_eq!(bus.stats().puts, 400);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_appends_are_all_retained() {
    let bus = InMemoryDataBus::new();
    let mut handles = Vec::new();
    for worker in 0..4 {
        let bus = Arc::clone(&bus);
        handles.push(tokio::spawn(async move {
            for idx in 0..25 {
                bus.append_focusable(
                    ElementId::new(format!("a.w{worker}")),
                    Properties::from([("idx".to_string(), idx.to_string())]),
                );
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    let entries = bus.focusables();
    assert_eq!(entries.len(), 100);
    let from_worker_two: Vec<&str> = entries
        .iter()
        .filter(|e| e.id.as_str() == "a.w2")
        .map(|e| e.properties["idx"].as_str())
        .collect();
    let expected: Vec<String> = (0..25).map(|i| i.to_string()).collect();
    assert_eq!(from_worker_two, expected.iter().map(String::as_str).collect::<Vec<_>>());
}
