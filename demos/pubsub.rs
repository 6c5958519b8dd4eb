use typebus::prelude::*;

#[derive(Debug)]
struct JobQueued {
    id: u64,
    queue: String,
}

impl Event for JobQueued {
    fn event_name() -> &'static str {
        "job-queued"
    }
}

#[derive(Debug)]
struct JobDone {
    id: u64,
}

impl Event for JobDone {
    fn event_name() -> &'static str {
        "job-done"
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let bus = EventBus::new();

    // Inline listeners fire during emit, in registration order.
    let audit =
        Listener::new(|job: &JobQueued| println!("📥 job {} queued on '{}'", job.id, job.queue))
            .with_name("audit");
    bus.on(&audit);

    let first = Listener::new(|job: &JobQueued| println!("🥇 first job of the run: {}", job.id));
    bus.once(&first);

    // A per-event stream drains payloads with one-element backpressure.
    let mut jobs = bus.subscribe::<JobQueued>();
    let worker = tokio::spawn(async move {
        while let Some(job) = jobs.recv().await {
            println!("⚙️  working on job {}", job.id);
        }
        println!("⚙️  worker shutting down");
    });

    // A bus-wide tap sees every event, tagged with its name.
    let mut tap = bus.subscribe_all();
    let monitor = tokio::spawn(async move {
        let mut seen = 0u32;
        while let Some(record) = tap.recv().await {
            match record.payload::<JobDone>() {
                Some(done) => println!("🛰  record #{}: job {} finished", record.seq(), done.id),
                None => println!("🛰  record #{}: {}", record.seq(), record.name()),
            }
            seen += 1;
            if seen == 4 {
                break;
            }
        }
        seen
    });

    println!("Publishing events...");
    for id in 1..=3 {
        bus.emit(JobQueued {
            id,
            queue: "default".into(),
        })
        .await?;
    }
    bus.emit(JobDone { id: 1 }).await?;

    let records = monitor.await.unwrap();
    println!("🛰  monitor saw {records} records");

    // Closing the bus ends every remaining stream.
    bus.close_all();
    worker.await.unwrap();

    println!("✅ done: {}", bus.stats());
    Ok(())
}
