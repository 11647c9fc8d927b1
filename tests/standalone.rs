use std::fs;
use std::path::Path;

use mrlocal::standalone::engine::{filter_output, run_standalone_job};
use mrlocal::standalone::Job;
use mrlocal::workload::tfidf::tf_idf;
use tempfile::TempDir;

fn write_files(dir: &Path, files: &[(&str, &str)]) {
    fs::create_dir_all(dir).unwrap();
    for (name, content) in files {
        fs::write(dir.join(name), content).unwrap();
    }
}

fn job(root: &TempDir, workload: &str, reducers: usize) -> Job {
    let input = root.path().join("input").join("*.txt");
    let output = root.path().join("out");
    let mut job = Job::new(input.to_str().unwrap(), workload, output.to_str().unwrap());
    job.engine.num_reducers = reducers;
    job
}

fn output_lines(dir: &str) -> Vec<String> {
    let mut lines = Vec::new();
    for entry in fs::read_dir(dir).unwrap() {
        let content = fs::read_to_string(entry.unwrap().path()).unwrap();
        lines.extend(content.lines().map(str::to_string));
    }
    lines.sort();
    lines
}

#[test]
fn tfidf_scores_reviews_and_filters_by_word() {
    let root = tempfile::tempdir().unwrap();
    write_files(
        &root.path().join("input"),
        &[
            ("1.txt", "pos\tGreat plot, great cast\n"),
            ("2.txt", "neg\tWeak plot"),
            ("3.txt", "pos\tGreat fun"),
        ],
    );
    let job = job(&root, "tfidf", 3);
    let output = run_standalone_job(&job).unwrap();
    assert_eq!(output.num_buckets(), 3);
    for bucket in 0..3 {
        assert!(Path::new(&job.output)
            .join(format!("mr-out-{}", bucket))
            .is_file());
    }

    // "great plot, great cast" splits into 5 fields, one of them empty.
    let plot = filter_output(&job.output, "plot").unwrap();
    assert_eq!(
        plot,
        vec![
            format!("1\tplot\t{}", tf_idf(1, 5, 3, 2)),
            format!("2\tplot\t{}", tf_idf(1, 2, 3, 2)),
        ]
    );

    let great = filter_output(&job.output, "great").unwrap();
    assert_eq!(
        great,
        vec![
            format!("1\tgreat\t{}", tf_idf(2, 5, 3, 2)),
            format!("3\tgreat\t{}", tf_idf(1, 2, 3, 2)),
        ]
    );

    let weak = filter_output(&job.output, "weak").unwrap();
    assert_eq!(weak, vec![format!("2\tweak\t{}", tf_idf(1, 2, 3, 1))]);
    assert!(filter_output(&job.output, "missing").unwrap().is_empty());
}

#[test]
fn word_count_writes_every_word_once() {
    let root = tempfile::tempdir().unwrap();
    write_files(
        &root.path().join("input"),
        &[("a.txt", "the cat sat"), ("b.txt", "The dog sat.")],
    );
    let mut job = job(&root, "wc", 2);
    job.engine.num_mappers = 2;
    run_standalone_job(&job).unwrap();

    assert_eq!(
        output_lines(&job.output),
        vec!["cat 1", "dog 1", "sat 2", "the 2"]
    );
}

#[test]
fn grep_passes_workload_arguments() {
    let root = tempfile::tempdir().unwrap();
    write_files(
        &root.path().join("input"),
        &[("poem.txt", "roses are red\nviolets are blue\nred wine\n")],
    );
    let mut job = job(&root, "grep", 1);
    job.args = vec!["--term".to_string(), "red".to_string()];
    run_standalone_job(&job).unwrap();

    let lines = output_lines(&job.output);
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("poem.txt:1:: roses are red"));
    assert!(lines[1].ends_with("poem.txt:3:: red wine"));
}

#[test]
fn unlabelled_review_fails_the_job() {
    let root = tempfile::tempdir().unwrap();
    write_files(
        &root.path().join("input"),
        &[("1.txt", "pos\tfine"), ("2.txt", "no tab at all")],
    );
    let job = job(&root, "tfidf", 2);
    let err = run_standalone_job(&job).unwrap_err();
    assert!(format!("{:#}", err).contains("2.txt"));
    assert!(!Path::new(&job.output).exists());
}

#[test]
fn missing_inputs_and_unknown_workloads_are_errors() {
    let root = tempfile::tempdir().unwrap();
    assert!(run_standalone_job(&job(&root, "wc", 1)).is_err());

    write_files(&root.path().join("input"), &[("a.txt", "x")]);
    assert!(run_standalone_job(&job(&root, "no-such-app", 1)).is_err());
}
