use mintset::parse_page_spec;

pub fn run(spec: &str) {
    let indices = parse_page_spec(spec);
    if indices.is_empty() {
        println!("(no pages)");
        return;
    }
    let list: Vec<String> = indices.iter().map(usize::to_string).collect();
    println!("{}", list.join(" "));
}
