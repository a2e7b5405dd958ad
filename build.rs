fn main() {
    println!("cargo:rerun-if-changed=.env");
    // Variables already set in the environment take precedence over `.env`
    if let Err(e) = dotenv_build::output(dotenv_build::Config::default()) {
        println!("cargo:warning=.env not loaded: {e}");
    }

    let version = chrono::Utc::now().format("%Y.%m.%d-%H%M");
    println!("cargo:rustc-env=BUILD_VERSION={version}");
}
