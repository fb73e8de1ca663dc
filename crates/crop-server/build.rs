fn main() {
    // Re-embed the page template when it changes
    println!("cargo:rerun-if-changed=templates/");
}
