use mock_service::Faults;
use std::sync::OnceLock;
use tracing::error;
use tracing_subscriber::FmtSubscriber;

/// Start one mock service for this test binary and point `BASE_URL` at it.
///
/// The service runs on its own runtime so it outlives the runtime of any single test.
#[allow(unused)]
pub fn serve(faults: Faults) -> &'static str {
    static BASE_URL: OnceLock<String> = OnceLock::new();

    BASE_URL.get_or_init(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            default_panic(info);
            error!("Panic occurred: {info:?}");
        }));

        let _ = FmtSubscriber::builder()
            .with_env_filter("loadcheck=debug,load_tests=debug,mock_service=debug")
            .try_init();

        let (tx, rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async move {
                let addr = mock_service::spawn(faults).await.unwrap();
                tx.send(addr).unwrap();
                std::future::pending::<()>().await
            });
        });

        let base_url = format!("http://{}", rx.recv().unwrap());
        std::env::set_var(loadcheck::core::BASE_URL_ENV, &base_url);
        base_url
    })
}
